//! Error types for the WebHook system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// WebHook system error variants.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("Unknown receiver: {0}")]
    UnknownReceiver(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("No secret configured for receiver '{receiver}' with id '{id}'")]
    MissingSecret { receiver: String, id: String },

    #[error("Unsupported content type: receiver requires {expected}, got '{actual}'")]
    UnsupportedContentType {
        expected: &'static str,
        actual: String,
    },

    #[error("WebHook requests must use HTTPS")]
    InsecureConnection,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("SSRF protection: {0}")]
    SsrfDetected(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// JSON error response returned by receiver endpoints.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
}

impl IntoResponse for HookError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            HookError::UnknownReceiver(_) => (StatusCode::NOT_FOUND, "unknown_receiver"),
            HookError::InvalidSignature(_) => (StatusCode::BAD_REQUEST, "invalid_signature"),
            HookError::MissingSecret { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "missing_secret"),
            HookError::UnsupportedContentType { .. } => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_content_type")
            }
            HookError::InsecureConnection => (StatusCode::BAD_REQUEST, "https_required"),
            HookError::InvalidUrl(_) => (StatusCode::BAD_REQUEST, "invalid_url"),
            HookError::SsrfDetected(_) => (StatusCode::BAD_REQUEST, "ssrf_detected"),
            HookError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            HookError::Configuration(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error")
            }
            HookError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
            status: status.as_u16(),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, HookError>;
