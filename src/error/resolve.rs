use thiserror::Error;

use crate::error::directory::DirectoryError;

/// Classified failure of an identity resolution.
///
/// Stale cache entries and failed cache writes never appear here; the
/// resolver absorbs them and falls back to the directory.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The asserted login is malformed. Permanent; reject the request.
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// The login is unknown and auto sign-up is off. Permanent.
    #[error("user `{0}` is not provisioned and sign up is disabled")]
    SignUpDisabled(String),

    /// The directory could not be reached. Transient; the request may be retried.
    #[error("user directory unavailable")]
    DirectoryUnavailable(#[source] anyhow::Error),

    /// The directory holds a record that cannot be decoded. Permanent.
    #[error("user directory returned an unreadable record")]
    DirectoryCorrupt(#[source] anyhow::Error),

    /// The upsert succeeded but the user could not be loaded for the org.
    #[error("user {user_id} was upserted but cannot be signed in to org {org_id}")]
    DirectoryInconsistent { user_id: i64, org_id: i64 },

    /// The caller's deadline passed before resolution completed.
    #[error("identity resolution cancelled")]
    Cancelled,
}

impl ResolveError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ResolveError::DirectoryUnavailable(_) | ResolveError::Cancelled
        )
    }
}

impl From<DirectoryError> for ResolveError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::InvalidIdentity(msg) => ResolveError::InvalidIdentity(msg),
            DirectoryError::SignUpDisabled(login) => ResolveError::SignUpDisabled(login),
            DirectoryError::Unavailable(source) => ResolveError::DirectoryUnavailable(source),
            DirectoryError::Corrupt(source) => ResolveError::DirectoryCorrupt(source),
        }
    }
}
