//! # Shared Types Crate
//!
//! This crate contains the data model used by every Herald subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Directory entities, target specifications and
//!   dispatch results are defined once here.
//! - **Transient Requests**: `BroadcastRequest` and `BroadcastResult` live for a
//!   single dispatch call; only the trimmed `HistoryRecord` is persisted.
//! - **Read-Only Sessions**: `AdminSession` is decoded from a client credential
//!   and never mutated server-side.

pub mod entities;
pub mod errors;
pub mod session;

pub use entities::*;
pub use errors::*;
pub use session::{AdminSession, AuthState};
