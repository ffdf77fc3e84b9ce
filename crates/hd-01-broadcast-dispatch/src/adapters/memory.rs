//! In-memory adapters.
//!
//! Used for wiring without external services and as test doubles.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_types::{Directory, Guild, HistoryRecord, SendErrorKind, User};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

use crate::domain::{DirectoryError, HistoryError, OutgoingPayload, SendError};
use crate::ports::{DirectoryProvider, HistoryStore, MessageSender};

/// Directory held in memory. Replaceable at runtime.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    snapshot: RwLock<Directory>,
    unavailable: AtomicBool,
    guild_queries: AtomicUsize,
    user_queries: AtomicUsize,
}

impl InMemoryDirectory {
    pub fn new(directory: Directory) -> Self {
        Self {
            snapshot: RwLock::new(directory),
            ..Default::default()
        }
    }

    pub fn replace(&self, directory: Directory) {
        *self.snapshot.write() = directory;
    }

    /// Make every query fail, simulating an outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn guild_queries(&self) -> usize {
        self.guild_queries.load(Ordering::SeqCst)
    }

    pub fn user_queries(&self) -> usize {
        self.user_queries.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), DirectoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DirectoryError("in-memory directory marked unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl DirectoryProvider for InMemoryDirectory {
    async fn list_guilds_with_channels(&self) -> Result<Vec<Guild>, DirectoryError> {
        self.guild_queries.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.snapshot.read().guilds.clone())
    }

    async fn list_users(&self) -> Result<Vec<User>, DirectoryError> {
        self.user_queries.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.snapshot.read().users.clone())
    }
}

/// History kept in a vector.
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    records: Mutex<Vec<HistoryRecord>>,
    failing: AtomicBool,
    appended: Notify,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every append fails.
    pub fn failing() -> Self {
        let store = Self::default();
        store.failing.store(true, Ordering::SeqCst);
        store
    }

    pub fn records(&self) -> Vec<HistoryRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until at least `count` records have been appended.
    ///
    /// History writes run on a spawned task, so callers observing them must wait.
    pub async fn wait_for(&self, count: usize) {
        loop {
            let appended = self.appended.notified();
            if self.len() >= count {
                return;
            }
            appended.await;
        }
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, record: HistoryRecord) -> Result<(), HistoryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(HistoryError::Unavailable("in-memory store marked failing".into()));
        }
        self.records.lock().push(record);
        self.appended.notify_waiters();
        Ok(())
    }
}

/// A delivered message as seen by `RecordingSender`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub target_id: String,
    pub direct: bool,
    pub content: String,
    pub has_image: bool,
}

/// Sender that records deliveries and can be told to fail or stall per target.
#[derive(Debug, Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<SentMessage>>,
    failures: RwLock<HashMap<String, SendErrorKind>>,
    delay: RwLock<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends to `target_id` fail with `kind`.
    pub fn fail_target(self, target_id: impl Into<String>, kind: SendErrorKind) -> Self {
        self.failures.write().insert(target_id.into(), kind);
        self
    }

    /// Every send sleeps for `delay` before completing.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.write() = Some(delay);
        self
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    /// Highest number of sends observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn deliver(
        &self,
        target_id: &str,
        direct: bool,
        payload: &OutgoingPayload,
    ) -> Result<(), SendError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let failure = self.failures.read().get(target_id).copied();
        if let Some(kind) = failure {
            debug!(target_id, ?kind, "recording sender: simulated failure");
            return Err(SendError::new(kind, "simulated failure"));
        }

        self.sent.lock().push(SentMessage {
            target_id: target_id.to_string(),
            direct,
            content: payload.content.clone(),
            has_image: payload.image.is_some(),
        });
        Ok(())
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send_to_channel(
        &self,
        channel_id: &str,
        payload: &OutgoingPayload,
    ) -> Result<(), SendError> {
        self.deliver(channel_id, false, payload).await
    }

    async fn send_dm(&self, user_id: &str, payload: &OutgoingPayload) -> Result<(), SendError> {
        self.deliver(user_id, true, payload).await
    }
}
