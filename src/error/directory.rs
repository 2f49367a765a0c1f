use thiserror::Error;

/// Failures reported by a [`UserDirectory`](crate::directory::UserDirectory).
///
/// "User not found" is not an error at this layer: lookups return
/// `Ok(None)` so callers can tell a definitive absence apart from a
/// directory that could not be asked.
///
/// # Example
/// ```
/// use auth_proxy::error::directory::DirectoryError;
///
/// let err = DirectoryError::InvalidIdentity("login must not be empty".into());
/// assert_eq!(err.to_string(), "invalid identity: login must not be empty");
/// assert!(!err.is_transient());
/// ```
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The external login failed validation.
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// The login is unknown and creating users is not allowed.
    #[error("user `{0}` does not exist and sign up is disabled")]
    SignUpDisabled(String),

    /// The backing store could not be reached or failed mid-operation.
    #[error("user directory unavailable")]
    Unavailable(#[source] anyhow::Error),

    /// The store answered with a record that cannot be decoded. Retrying
    /// reads the same record again.
    #[error("user directory returned an unreadable record")]
    Corrupt(#[source] anyhow::Error),
}

impl DirectoryError {
    pub fn is_transient(&self) -> bool {
        matches!(self, DirectoryError::Unavailable(_))
    }
}

impl From<anyhow::Error> for DirectoryError {
    fn from(e: anyhow::Error) -> Self {
        DirectoryError::Unavailable(e)
    }
}
