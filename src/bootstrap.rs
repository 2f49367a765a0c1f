//! Wiring of the auth proxy from [`AppConfig`].
//!
//! The MySQL pool backs the user directory and, with
//! `REMOTE_CACHE_TYPE=database`, the identity cache as well.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cache::{memory::InMemoryIdentityCache, mysql_cache::MySqlIdentityCache, port::IdentityCache};
use crate::config::app::AppConfig;
use crate::config::auth_proxy::AuthProxyConfig;
use crate::config::cache::CacheBackend;
use crate::config::db::create_pool;
use crate::db::{mysql_adapter::MySqlDb, port::Db};
use crate::directory::{mysql_directory::MySqlUserDirectory, port::UserDirectory};
use crate::proxy::resolver::{AuthProxyResolver, ResolverSettings};
use crate::web::auth_proxy::AuthProxy;

/// Builds the MySQL-backed auth proxy state.
pub fn build_auth_proxy(cfg: &AppConfig) -> Result<Arc<AuthProxy>> {
    let pool = create_pool(&cfg.db).context("failed to set up the user directory database")?;
    let db: Arc<dyn Db> = Arc::new(MySqlDb::new(pool));

    let cache = build_cache(cfg.cache.backend, db.clone());
    let directory: Arc<dyn UserDirectory> = Arc::new(MySqlUserDirectory::new(db));

    tracing::info!(
        enabled = cfg.auth_proxy.enabled,
        header = %cfg.auth_proxy.header_name,
        cache = ?cfg.cache.backend,
        "auth proxy configured"
    );
    Ok(assemble(directory, cache, cfg.auth_proxy.clone()))
}

pub fn build_cache(backend: CacheBackend, db: Arc<dyn Db>) -> Arc<dyn IdentityCache> {
    match backend {
        CacheBackend::Memory => Arc::new(InMemoryIdentityCache::default()),
        CacheBackend::Database => Arc::new(MySqlIdentityCache::new(db)),
    }
}

/// Assembles the middleware state from already-built backends.
pub fn assemble(
    directory: Arc<dyn UserDirectory>,
    cache: Arc<dyn IdentityCache>,
    cfg: AuthProxyConfig,
) -> Arc<AuthProxy> {
    let resolver = AuthProxyResolver::new(directory, cache, ResolverSettings::from(&cfg));
    Arc::new(AuthProxy::new(resolver, cfg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::cache::CacheConfig;
    use crate::config::db::DbConfig;
    use crate::db::testing::{Reply, ScriptedDb};
    use crate::directory::memory::InMemoryUserDirectory;
    use crate::identity::model::HeaderProperty;

    fn app_config(db: DbConfig) -> AppConfig {
        AppConfig {
            db,
            cache: CacheConfig::default(),
            auth_proxy: AuthProxyConfig::default(),
            log_level: "info".into(),
        }
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let err = build_auth_proxy(&app_config(DbConfig::default()))
            .err()
            .expect("must fail without DATABASE_URL");
        assert!(format!("{err:#}").contains("DATABASE_URL"));
    }

    #[tokio::test]
    async fn database_cache_goes_through_db_port() {
        let db = Arc::new(ScriptedDb::new(vec![Reply::Row(None)]));
        let cache = build_cache(CacheBackend::Database, db.clone());

        assert_eq!(cache.get("auth-proxy-sync-ttl:k").await.unwrap(), None);
        assert_eq!(db.calls().len(), 1);
    }

    #[tokio::test]
    async fn memory_cache_does_not_touch_db() {
        let db = Arc::new(ScriptedDb::new(vec![]));
        let cache = build_cache(CacheBackend::Memory, db.clone());

        assert_eq!(cache.get("auth-proxy-sync-ttl:k").await.unwrap(), None);
        assert!(db.calls().is_empty());
    }

    #[test]
    fn assemble_carries_resolver_settings() {
        let cfg = AuthProxyConfig {
            header_property: HeaderProperty::Email,
            auto_sign_up: false,
            ..AuthProxyConfig::default()
        };
        let proxy = assemble(
            Arc::new(InMemoryUserDirectory::new()),
            Arc::new(InMemoryIdentityCache::default()),
            cfg,
        );

        let settings = proxy.resolver.settings();
        assert_eq!(settings.header_property, HeaderProperty::Email);
        assert!(!settings.auto_sign_up);
    }
}
