//! Outbound (Driven) ports for the broadcast dispatch subsystem.
//!
//! The chat platform, directory service and history persistence live
//! outside this crate; these traits are the seams they plug into.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared_types::{Guild, HistoryRecord, User};

use crate::domain::{DirectoryError, HistoryError, OutgoingPayload, SendError};

/// Enumerates guilds, channels and users with permissions already evaluated.
#[async_trait]
pub trait DirectoryProvider: Send + Sync {
    /// Every guild the bot is in, with its channels.
    async fn list_guilds_with_channels(&self) -> Result<Vec<Guild>, DirectoryError>;

    /// Every user reachable by direct message.
    async fn list_users(&self) -> Result<Vec<User>, DirectoryError>;
}

/// The per-target send capability.
///
/// Implementations report failure through `SendError::kind`; a retry policy
/// can wrap an implementation without touching aggregation.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_to_channel(
        &self,
        channel_id: &str,
        payload: &OutgoingPayload,
    ) -> Result<(), SendError>;

    async fn send_dm(&self, user_id: &str, payload: &OutgoingPayload) -> Result<(), SendError>;
}

/// Append-only broadcast history.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, record: HistoryRecord) -> Result<(), HistoryError>;
}

/// Time source for result timestamps.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed time source for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource(pub DateTime<Utc>);

impl TimeSource for FixedTimeSource {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
