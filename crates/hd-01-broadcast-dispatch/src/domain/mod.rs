//! # Domain Layer - Broadcast Dispatch
//!
//! Pure logic with no I/O.
//!
//! ## Components
//!
//! - `targets`: TargetSpec + Directory -> deduplicated delivery targets
//! - `media`: attachment validation and JPEG normalization
//! - `payload`: message text composition and length limit
//! - `errors`: whole-dispatch and per-target error types

pub mod errors;
pub mod media;
pub mod payload;
pub mod targets;

pub use errors::*;
pub use media::*;
pub use payload::*;
pub use targets::*;
