//! Broadcast dispatch error types.
//!
//! Whole-dispatch failures (`DispatchError`) are distinct from per-target
//! failures (`SendError`), which are folded into the outcome list.

use shared_types::{SendErrorKind, ValidationError};
use std::time::Duration;
use thiserror::Error;

/// Target resolution produced nothing to send to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("no eligible targets after permission and ban filtering")]
    EmptyTargetSet,
}

/// Attachment rejected during normalization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("unsupported image format (accepted: JPEG, PNG, GIF, WebP, BMP)")]
    UnsupportedFormat,

    #[error("image is {size} bytes, limit is {max}")]
    TooLarge { size: usize, max: usize },

    #[error("image payload is not valid base64")]
    InvalidEncoding,

    #[error("image could not be decoded: {0}")]
    Decode(String),

    #[error("image could not be re-encoded: {0}")]
    Encode(String),
}

/// Directory collaborator could not produce a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("directory unavailable: {0}")]
pub struct DirectoryError(pub String);

/// A single send failed. Never aborts the rest of the fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("send failed ({kind:?}): {message}")]
pub struct SendError {
    pub kind: SendErrorKind,
    pub message: String,
}

impl SendError {
    pub fn new(kind: SendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(limit: Duration) -> Self {
        Self::new(
            SendErrorKind::Timeout,
            format!("no response within {}ms", limit.as_millis()),
        )
    }
}

/// History write failed. Logged, never surfaced to the caller.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("history encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("history store unavailable: {0}")]
    Unavailable(String),
}

/// The whole dispatch was rejected; nothing was sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("target resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("attachment rejected: {0}")]
    Media(#[from] MediaError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}
