//! HTTP error type for the JSON endpoints.

use axum::extract::rejection::PathRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::auth::AuthError;
use crate::registry::RegistryError;

/// Stable, machine-readable error codes. Clients match on these, never on the
/// message.
pub mod error_code {
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const UPSTREAM_UNAVAILABLE: &str = "UPSTREAM_UNAVAILABLE";
    pub const INTERNAL: &str = "INTERNAL";
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Not signed in, or bad credentials. HTTP 401.
    #[error("{0}")]
    Unauthorized(String),

    /// Input data is invalid. HTTP 400.
    #[error("{0}")]
    Validation(String),

    /// The hosted auth service could not be reached. HTTP 502.
    #[error("{0}")]
    Upstream(String),

    /// Unexpected internal error. HTTP 500.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => error_code::UNAUTHENTICATED,
            ApiError::Validation(_) => error_code::VALIDATION_FAILED,
            ApiError::Upstream(_) => error_code::UPSTREAM_UNAVAILABLE,
            ApiError::Internal(_) => error_code::INTERNAL,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            e if e.is_rejection() => ApiError::Unauthorized(e.to_string()),
            AuthError::Transport(e) => {
                tracing::error!("Auth service unreachable: {}", e);
                ApiError::Upstream("auth service unavailable".to_string())
            }
            e => {
                tracing::error!("Auth error: {}", e);
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        tracing::error!("Provider account registry error: {}", e);
        ApiError::Internal("provider account storage failed".to_string())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "code": self.error_code(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
