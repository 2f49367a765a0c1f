//! # Auth Proxy Middleware
//!
//! Axum middleware that trusts an upstream authenticating proxy and attaches
//! the resolved [`SignedInUser`] to the request extensions.
//!
//! ## Behavior
//! - Disabled, or no identity header: the request passes through untouched.
//! - Peer outside the whitelist: `407 Proxy Authentication Required`.
//! - Otherwise the header is resolved against the user directory; failures
//!   are rendered by [`AuthProxyError`].
//!
//! ## Example
//! ```rust,ignore
//! use std::{net::SocketAddr, sync::Arc};
//! use axum::{routing::get, Router};
//! use auth_proxy::web::auth_proxy::{with_auth_proxy, AuthProxy};
//! use auth_proxy::web::extract::SignedIn;
//!
//! let state: Arc<AuthProxy> = auth_proxy::bootstrap::build_auth_proxy(&cfg)?;
//! let app = with_auth_proxy(
//!     Router::new().route("/api/me", get(|SignedIn(u): SignedIn| async move { u.login })),
//!     state,
//! );
//! axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
//! ```

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request},
    http::{HeaderMap, StatusCode},
    middleware::{from_fn, Next},
    response::{IntoResponse, Response},
    Extension, Router,
};
use tokio::time::Instant;

use crate::config::auth_proxy::AuthProxyConfig;
use crate::error::auth_proxy::AuthProxyError;
use crate::identity::model::{AdditionalValues, SignedInUser};
use crate::proxy::resolver::AuthProxyResolver;

/// Shared state for the middleware and the logout handler.
pub struct AuthProxy {
    pub resolver: AuthProxyResolver,
    pub config: AuthProxyConfig,
}

impl AuthProxy {
    pub fn new(resolver: AuthProxyResolver, config: AuthProxyConfig) -> Self {
        Self { resolver, config }
    }

    /// Authenticates a request from its headers and peer address.
    ///
    /// `Ok(None)` means the request carries no proxy identity.
    pub async fn authenticate(
        &self,
        headers: &HeaderMap,
        peer: Option<IpAddr>,
    ) -> Result<Option<SignedInUser>, AuthProxyError> {
        if !self.config.enabled {
            return Ok(None);
        }
        let Some(header_value) = self.identity_header(headers)? else {
            return Ok(None);
        };

        self.check_whitelist(peer)?;
        let org_id = self.org_id(headers)?;
        let extras = self.additional_values(headers)?;

        let user = match self.config.resolve_timeout {
            Some(timeout) => {
                self.resolver
                    .resolve_with_deadline(&header_value, &extras, org_id, Instant::now() + timeout)
                    .await?
            }
            None => {
                self.resolver
                    .resolve_with_extras(&header_value, &extras, org_id)
                    .await?
            }
        };
        Ok(Some(user))
    }

    fn identity_header(&self, headers: &HeaderMap) -> Result<Option<String>, AuthProxyError> {
        read_header(headers, &self.config.header_name)
    }

    fn check_whitelist(&self, peer: Option<IpAddr>) -> Result<(), AuthProxyError> {
        let whitelist = &self.config.whitelist;
        if whitelist.is_empty() {
            return Ok(());
        }
        match peer.map(|ip| ip.to_canonical()) {
            Some(ip) if whitelist.allows(ip) => Ok(()),
            other => Err(AuthProxyError::NotWhitelisted(other)),
        }
    }

    fn org_id(&self, headers: &HeaderMap) -> Result<i64, AuthProxyError> {
        match read_header(headers, &self.config.org_header)? {
            None => Ok(self.config.default_org_id),
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) if id > 0 => Ok(id),
                _ => Err(AuthProxyError::InvalidOrgHeader(raw)),
            },
        }
    }

    fn additional_values(&self, headers: &HeaderMap) -> Result<AdditionalValues, AuthProxyError> {
        let cfg = &self.config.headers;
        let read = |name: &Option<String>| match name {
            Some(name) => read_header(headers, name),
            None => Ok(None),
        };
        Ok(AdditionalValues {
            name: read(&cfg.name)?,
            email: read(&cfg.email)?,
            login: read(&cfg.login)?,
        })
    }
}

/// Trimmed, non-empty header value. Non UTF-8 values are rejected.
fn read_header(headers: &HeaderMap, name: &str) -> Result<Option<String>, AuthProxyError> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AuthProxyError::InvalidHeader(name.to_string()))?
        .trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}

/// Axum middleware (use with [`from_fn`]) that resolves the proxy identity.
///
/// Requires `Extension<Arc<AuthProxy>>`. The peer address is read from
/// `ConnectInfo<SocketAddr>` when the server provides it.
pub async fn auth_proxy_middleware(
    Extension(proxy): Extension<Arc<AuthProxy>>,
    mut req: Request,
    next: Next,
) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let headers = req.headers().clone();

    match proxy.authenticate(&headers, peer).await {
        Ok(Some(user)) => {
            tracing::debug!(user_id = user.user_id, org_id = user.org_id, "auth proxy signed in user");
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Ok(None) => next.run(req).await,
        Err(e) => e.into_response(),
    }
}

/// Logout hook: forgets the cached mapping for the current identity header.
pub async fn auth_proxy_logout(
    Extension(proxy): Extension<Arc<AuthProxy>>,
    headers: HeaderMap,
) -> Result<StatusCode, AuthProxyError> {
    if let Some(header_value) = proxy.identity_header(&headers)? {
        let extras = proxy.additional_values(&headers)?;
        proxy.resolver.forget(&header_value, &extras).await;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Wraps `router` with the middleware and its state.
pub fn with_auth_proxy(router: Router, proxy: Arc<AuthProxy>) -> Router {
    router
        .layer(from_fn(auth_proxy_middleware))
        .layer(Extension(proxy))
}
