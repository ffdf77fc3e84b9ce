//! Gateway error types and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hd_01_broadcast_dispatch::{DispatchError, MediaError, ResolutionError};
use std::fmt;

/// Stable machine-readable error codes
pub mod codes {
    pub const INVALID_REQUEST: &str = "invalid_request";
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const NO_TARGETS: &str = "no_targets";
    pub const UNSUPPORTED_MEDIA: &str = "unsupported_media";
    pub const INVALID_MEDIA: &str = "invalid_media";
    pub const MEDIA_TOO_LARGE: &str = "media_too_large";
    pub const MEDIA_ENCODING_FAILED: &str = "media_encoding_failed";
    pub const DIRECTORY_UNAVAILABLE: &str = "directory_unavailable";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// HTTP API error. Rendered as `{success: false, error, message}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// Body did not parse into the expected shape
    pub fn invalid_request(details: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_REQUEST,
            format!("Invalid request: {}", details.into()),
        )
    }

    /// Internal error
    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::INTERNAL_ERROR,
            format!("Internal error: {}", details.into()),
        )
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "success": false,
            "error": self.code,
            "message": self.message,
        })
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.to_json())).into_response()
    }
}

impl From<DispatchError> for ApiError {
    fn from(e: DispatchError) -> Self {
        let message = e.to_string();
        match e {
            DispatchError::Validation(_) => {
                Self::new(StatusCode::BAD_REQUEST, codes::VALIDATION_FAILED, message)
            }
            DispatchError::Resolution(ResolutionError::EmptyTargetSet) => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, codes::NO_TARGETS, message)
            }
            DispatchError::Media(MediaError::UnsupportedFormat) => {
                Self::new(StatusCode::BAD_REQUEST, codes::UNSUPPORTED_MEDIA, message)
            }
            DispatchError::Media(MediaError::InvalidEncoding | MediaError::Decode(_)) => {
                Self::new(StatusCode::BAD_REQUEST, codes::INVALID_MEDIA, message)
            }
            DispatchError::Media(MediaError::TooLarge { .. }) => {
                Self::new(StatusCode::PAYLOAD_TOO_LARGE, codes::MEDIA_TOO_LARGE, message)
            }
            DispatchError::Media(MediaError::Encode(_)) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::MEDIA_ENCODING_FAILED,
                message,
            ),
            DispatchError::Directory(_) => {
                Self::new(StatusCode::BAD_GATEWAY, codes::DIRECTORY_UNAVAILABLE, message)
            }
        }
    }
}

impl From<MediaError> for ApiError {
    fn from(e: MediaError) -> Self {
        DispatchError::from(e).into()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Gateway-level errors (not HTTP, internal use)
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}
