use std::net::IpAddr;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::error::resolve::ResolveError;

/// Failure of the auth proxy middleware, rendered as `{"message": ...}`.
#[derive(Debug, Error)]
pub enum AuthProxyError {
    #[error("request did not come from a whitelisted auth proxy")]
    NotWhitelisted(Option<IpAddr>),

    #[error("header `{0}` is not valid UTF-8")]
    InvalidHeader(String),

    #[error("invalid organization id `{0}`")]
    InvalidOrgHeader(String),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl AuthProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthProxyError::NotWhitelisted(_) => StatusCode::PROXY_AUTHENTICATION_REQUIRED,
            AuthProxyError::InvalidHeader(_) | AuthProxyError::InvalidOrgHeader(_) => {
                StatusCode::BAD_REQUEST
            }
            AuthProxyError::Resolve(e) => match e {
                ResolveError::InvalidIdentity(_) => StatusCode::BAD_REQUEST,
                ResolveError::SignUpDisabled(_) => StatusCode::FORBIDDEN,
                ResolveError::DirectoryUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                ResolveError::DirectoryCorrupt(_) | ResolveError::DirectoryInconsistent { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                ResolveError::Cancelled => StatusCode::GATEWAY_TIMEOUT,
            },
        }
    }
}

impl IntoResponse for AuthProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, %status, "auth proxy request failed");
        } else {
            tracing::warn!(error = %self, %status, "auth proxy request rejected");
        }
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}
