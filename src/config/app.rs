//! # Application Configuration Loader
//!
//! Provides a unified configuration loader for the auth proxy service:
//! database, identity cache backend and auth proxy behavior.
//!
//! Automatically loads `.env` files for non-production environments.
//! It checks for a custom `DOTENV_FILE` path first, then falls back to
//! `.env.{APP_ENV}` or `.env`.
//!
//! # Environment Variables
//! | Variable | Description | Default |
//! |-----------|-------------|----------|
//! | `APP_ENV` | Current environment (`development`, `production`, etc.) | `"development"` |
//! | `DOTENV_FILE` | Optional path to a custom dotenv file | *none* |
//! | `LOG_LEVEL` | Fallback log filter when `RUST_LOG` is unset | `"info"` |
//!
//! See [`AuthProxyConfig`], [`CacheConfig`] and [`DbConfig`] for the rest.
//!
//! # Example
//! ```rust,no_run
//! use auth_proxy::config::app::AppConfig;
//!
//! let cfg = AppConfig::from_env().expect("invalid configuration");
//! if cfg.auth_proxy.enabled {
//!     println!("trusting header {}", cfg.auth_proxy.header_name);
//! }
//! ```

use std::env;

use anyhow::Result;

use crate::config::{
    auth_proxy::AuthProxyConfig, cache::CacheConfig, db::DbConfig, env::read_string,
};

/// Top-level application configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub db: DbConfig,
    pub cache: CacheConfig,
    pub auth_proxy: AuthProxyConfig,
    pub log_level: String,
}

impl AppConfig {
    /// Loads application configuration from environment variables.
    ///
    /// ## Behavior
    /// - Reads `APP_ENV` (defaults to `"development"`).
    /// - Loads `.env` or `.env.{APP_ENV}` for non-production environments.
    /// - Parses all supported environment variables and falls back to defaults.
    ///
    /// # Errors
    /// Returns an error when an auth proxy or cache setting is malformed.
    pub fn from_env() -> Result<Self> {
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".into());

        if app_env != "production" {
            if let Ok(path) = env::var("DOTENV_FILE") {
                let _ = dotenvy::from_filename(path);
            } else {
                let candidate = format!(".env.{}", app_env);
                dotenvy::from_filename(&candidate)
                    .or_else(|_| dotenvy::dotenv())
                    .ok();
            }
        }

        Ok(AppConfig {
            db: DbConfig::from_env(),
            cache: CacheConfig::from_env()?,
            auth_proxy: AuthProxyConfig::from_env()?,
            log_level: read_string("LOG_LEVEL", "info"),
        })
    }
}
