//! # Error Types
//!
//! Errors shared across subsystems.

use thiserror::Error;

/// A broadcast request violates its invariants. Rejected before any send.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Body is empty or whitespace.
    #[error("message body must not be empty")]
    EmptyBody,

    /// `Users` target with no user ids.
    #[error("at least one user must be selected")]
    EmptyUserIds,

    /// `GuildChannels` target with no guild ids.
    #[error("at least one guild must be selected")]
    EmptyGuildIds,

    /// Composed message exceeds the platform limit.
    #[error("message is {len} characters, limit is {max}")]
    ContentTooLong { len: usize, max: usize },
}
