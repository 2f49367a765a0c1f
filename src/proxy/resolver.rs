//! # Auth Proxy Resolver
//!
//! Turns a trusted identity header into a directory-verified
//! [`SignedInUser`], using the identity cache to skip the upsert on
//! repeat visits.
//!
//! ## Resolution
//! 1. Derive the cache key from the header (and additional headers).
//! 2. On a cache hit, ask the directory for that user in the requested org.
//!    A definitive "not found", or a login that no longer matches, marks
//!    the entry stale and falls through. Cache read failures count as misses.
//! 3. Otherwise upsert the external identity, load the signed-in user and
//!    refresh the cache entry. Cache write failures are logged and ignored.
//!
//! The returned user was always read from the directory during the call,
//! so a stale cache can cost one extra round-trip but never a stale login.
//! Concurrent resolutions of the same login may all take the slow path;
//! the upsert is idempotent and the last cache write wins.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::cache::port::IdentityCache;
use crate::config::auth_proxy::AuthProxyConfig;
use crate::directory::port::{UpsertUser, UserDirectory};
use crate::error::resolve::ResolveError;
use crate::identity::model::{AdditionalValues, ExternalIdentity, HeaderProperty, OrgRole, SignedInUser};
use crate::proxy::key::derive_key_with_extras;

/// Resolver knobs taken from [`AuthProxyConfig`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolverSettings {
    pub header_property: HeaderProperty,
    pub auto_sign_up: bool,
    /// TTL of refreshed cache entries; zero keeps them until overwritten.
    pub sync_ttl: Duration,
    pub default_role: OrgRole,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self::from(&AuthProxyConfig::default())
    }
}

impl From<&AuthProxyConfig> for ResolverSettings {
    fn from(cfg: &AuthProxyConfig) -> Self {
        Self {
            header_property: cfg.header_property,
            auto_sign_up: cfg.auto_sign_up,
            sync_ttl: cfg.sync_ttl,
            default_role: cfg.default_role,
        }
    }
}

pub struct AuthProxyResolver {
    directory: Arc<dyn UserDirectory>,
    cache: Arc<dyn IdentityCache>,
    settings: ResolverSettings,
}

impl AuthProxyResolver {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        cache: Arc<dyn IdentityCache>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            directory,
            cache,
            settings,
        }
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Resolves a header value for `org_id`.
    ///
    /// The caller must reject empty headers before calling this.
    pub async fn resolve(
        &self,
        header_value: &str,
        org_id: i64,
    ) -> Result<SignedInUser, ResolveError> {
        self.resolve_with_extras(header_value, &AdditionalValues::default(), org_id)
            .await
    }

    /// Like [`resolve`](Self::resolve), with values of the additional
    /// identity headers folded into both the cache key and the upsert.
    #[tracing::instrument(name = "auth_proxy.resolve", skip_all, fields(org_id))]
    pub async fn resolve_with_extras(
        &self,
        header_value: &str,
        extras: &AdditionalValues,
        org_id: i64,
    ) -> Result<SignedInUser, ResolveError> {
        let key = derive_key_with_extras(header_value, &extras.key_parts());
        let identity =
            ExternalIdentity::from_header(header_value, self.settings.header_property, extras, org_id);

        if let Some(user) = self.from_cache(&key, &identity).await? {
            return Ok(user);
        }
        self.sync(&key, identity).await
    }

    /// Resolves, giving up with [`ResolveError::Cancelled`] once `deadline`
    /// passes. Outstanding directory and cache calls are dropped.
    pub async fn resolve_with_deadline(
        &self,
        header_value: &str,
        extras: &AdditionalValues,
        org_id: i64,
        deadline: Instant,
    ) -> Result<SignedInUser, ResolveError> {
        match tokio::time::timeout_at(deadline, self.resolve_with_extras(header_value, extras, org_id))
            .await
        {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(org_id, "auth proxy resolution hit its deadline");
                Err(ResolveError::Cancelled)
            }
        }
    }

    /// Drops the cached mapping for a header, e.g. on logout. Failures are
    /// logged only; the next request simply revalidates.
    pub async fn forget(&self, header_value: &str, extras: &AdditionalValues) {
        let key = derive_key_with_extras(header_value, &extras.key_parts());
        if let Err(e) = self.cache.delete(&key).await {
            tracing::warn!(%key, error = %e, "failed to remove auth proxy cache entry");
        }
    }

    async fn from_cache(
        &self,
        key: &str,
        identity: &ExternalIdentity,
    ) -> Result<Option<SignedInUser>, ResolveError> {
        let cached = match self.cache.get(key).await {
            Ok(Some(user_id)) => user_id,
            Ok(None) => {
                tracing::debug!(%key, "auth proxy cache miss");
                return Ok(None);
            }
            Err(e) => {
                tracing::warn!(%key, error = %e, "auth proxy cache read failed, treating as miss");
                return Ok(None);
            }
        };

        let org_id = identity.org_id;
        match self.directory.get_signed_in_user(cached, org_id).await? {
            Some(user) if user.login.eq_ignore_ascii_case(&identity.login) => {
                tracing::debug!(user_id = cached, org_id, "auth proxy cache hit");
                Ok(Some(user))
            }
            Some(user) => {
                tracing::debug!(
                    user_id = cached,
                    org_id,
                    current_login = %user.login,
                    "cached auth proxy user was renamed, resyncing"
                );
                Ok(None)
            }
            None => {
                tracing::debug!(user_id = cached, org_id, "stale auth proxy cache entry, resyncing");
                Ok(None)
            }
        }
    }

    async fn sync(&self, key: &str, identity: ExternalIdentity) -> Result<SignedInUser, ResolveError> {
        let org_id = identity.org_id;
        let cmd = UpsertUser {
            identity,
            signup_allowed: self.settings.auto_sign_up,
            default_role: self.settings.default_role,
        };

        let user = self.directory.upsert(&cmd).await?;
        let Some(signed_in) = self.directory.get_signed_in_user(user.id, org_id).await? else {
            tracing::error!(
                user_id = user.id,
                org_id,
                "user directory returned no signed-in user right after upsert"
            );
            return Err(ResolveError::DirectoryInconsistent {
                user_id: user.id,
                org_id,
            });
        };

        if let Err(e) = self.cache.set(key, user.id, self.settings.sync_ttl).await {
            tracing::warn!(%key, user_id = user.id, error = %e, "failed to store auth proxy cache entry");
        }

        tracing::debug!(user_id = user.id, org_id, "auth proxy user synced");
        Ok(signed_in)
    }
}
