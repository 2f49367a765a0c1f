//! # auth_proxy
//!
//! Identity resolution for requests arriving through a trusted
//! authenticating reverse proxy.
//!
//! The proxy asserts a login in a header (`X-WEBAUTH-USER` by default).
//! [`proxy::resolver::AuthProxyResolver`] turns it into a directory-verified
//! [`identity::model::SignedInUser`], using a short-lived cache of
//! login → user id hints to avoid re-syncing the user on every request.
//!
//! - Cache backends: in-memory or the MySQL `cache_data` table (`cache`)
//! - User directory: in-memory or MySQL `user` / `org_user` tables (`directory`)
//! - Axum middleware, logout handler and extractor (`web`)
//! - Environment configuration (`config`)
//!
//! ## Example usage (in another crate)
//!
//! ```rust,no_run
//! use std::net::SocketAddr;
//! use auth_proxy::anyhow::Result;
//! use auth_proxy::axum::{routing::get, Router};
//! use auth_proxy::config::app::AppConfig;
//! use auth_proxy::web::{with_auth_proxy, SignedIn};
//!
//! # async fn run() -> Result<()> {
//! let cfg = AppConfig::from_env()?;
//! auth_proxy::telemetry::init_tracing(&cfg.log_level);
//!
//! let proxy = auth_proxy::bootstrap::build_auth_proxy(&cfg)?;
//! let app = with_auth_proxy(
//!     Router::new().route("/api/me", get(|SignedIn(u): SignedIn| async move { u.login })),
//!     proxy,
//! );
//!
//! let listener = auth_proxy::tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! auth_proxy::axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
//! # Ok(())
//! # }
//! ```

// ===============================
// Re-exports of external crates
// ===============================

pub use anyhow;
pub use async_trait;
pub use axum;
pub use chrono;
pub use dotenvy;
pub use ipnetwork;
pub use mysql;
pub use serde;
pub use serde_json;
pub use sha2;
pub use tokio;
pub use tracing;

// ===============================
// Public modules
// ===============================
pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod identity;
pub mod proxy;
pub mod telemetry;
pub mod time;
pub mod web;
