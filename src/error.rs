//! Unified error handling for nirmaan-stack.
//!
//! Lower layers keep their own error enums ([`crate::db::DbError`],
//! [`crate::chat::SourceError`], [`crate::security::AccessError`]); services
//! map them into [`ServiceError`], which carries the caller-facing message,
//! a metrics label and the HTTP response shape.

use crate::security::AccessError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced to API callers.
///
/// `Internal` carries only the generic text shown to the caller; details are
/// logged where the failure happened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AuthenticationFailed(String),

    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::PermissionDenied(_) => "permission_denied",
            Self::NotFound(_) => "not_found",
            Self::AuthenticationFailed(_) => "authentication_failed",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Exception class name expected by API clients.
    pub fn exc_type(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "ValidationError",
            Self::PermissionDenied(_) => "PermissionError",
            Self::NotFound(_) => "DoesNotExistError",
            Self::AuthenticationFailed(_) => "AuthenticationError",
            Self::Internal(_) => "InternalError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AccessError> for ServiceError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::DocumentNotFound { doctype, name } => {
                Self::NotFound(format!("{doctype} {name} not found."))
            }
            AccessError::Backend(e) => {
                tracing::error!(error = %e, "permission check failed");
                Self::Internal("An error occurred while checking permissions.".to_string())
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = json!({
            "exc_type": self.exc_type(),
            "message": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}
