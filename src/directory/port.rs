//! # User Directory Port
//!
//! The source of truth for users and org memberships. The resolver only
//! relies on the three operations below and their stated semantics; it
//! assumes nothing about storage, schema or transactions.

use async_trait::async_trait;

use crate::error::directory::DirectoryError;
use crate::identity::model::{ExternalIdentity, InternalUser, OrgRole, SignedInUser};

/// Longest login accepted by [`validate_login`].
pub const MAX_LOGIN_LEN: usize = 190;

/// Create-or-update command keyed on the external login.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpsertUser {
    pub identity: ExternalIdentity,
    /// Whether an unknown login may be created.
    pub signup_allowed: bool,
    /// Role granted when the user is added to `identity.org_id`.
    pub default_role: OrgRole,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn lookup_by_external_login(
        &self,
        login: &str,
    ) -> Result<Option<InternalUser>, DirectoryError>;

    /// Idempotent create-or-update.
    ///
    /// Implementations must
    /// - reject logins failing [`validate_login`] with `InvalidIdentity`
    /// - find an existing user by login, then by email when one is given
    /// - return `SignUpDisabled` for unknown logins unless `signup_allowed`
    /// - refresh email and name when the identity carries them
    /// - ensure membership of `identity.org_id`, keeping an existing role
    async fn upsert(&self, cmd: &UpsertUser) -> Result<InternalUser, DirectoryError>;

    /// Existence check scoped by user and org. `Ok(None)` when the user is
    /// gone or is not a member of `org_id`.
    async fn get_signed_in_user(
        &self,
        user_id: i64,
        org_id: i64,
    ) -> Result<Option<SignedInUser>, DirectoryError>;
}

/// Checks that an external login can be stored.
///
/// # Example
/// ```
/// use auth_proxy::directory::port::validate_login;
///
/// assert!(validate_login("alice").is_ok());
/// assert!(validate_login("   ").is_err());
/// ```
pub fn validate_login(login: &str) -> Result<(), DirectoryError> {
    if login.trim().is_empty() {
        return Err(DirectoryError::InvalidIdentity(
            "login must not be empty".into(),
        ));
    }
    if login.chars().count() > MAX_LOGIN_LEN {
        return Err(DirectoryError::InvalidIdentity(format!(
            "login exceeds {MAX_LOGIN_LEN} characters"
        )));
    }
    if login.chars().any(char::is_control) {
        return Err(DirectoryError::InvalidIdentity(
            "login contains control characters".into(),
        ));
    }
    Ok(())
}
