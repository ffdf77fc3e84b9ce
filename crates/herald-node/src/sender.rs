//! Sender that logs instead of delivering.
//!
//! Stands in for a chat platform client so the node can be exercised end
//! to end without credentials.

use async_trait::async_trait;
use hd_01_broadcast_dispatch::{MessageSender, OutgoingPayload, SendError};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

#[derive(Debug, Default)]
pub struct DryRunSender {
    delivered: AtomicUsize,
}

impl DryRunSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends accepted so far.
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::Relaxed)
    }

    fn log(&self, target_id: &str, direct: bool, payload: &OutgoingPayload) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        info!(
            target_id,
            direct,
            chars = payload.content.chars().count(),
            image_bytes = payload.image.as_ref().map_or(0, |image| image.len()),
            "Dry run: message not delivered"
        );
    }
}

#[async_trait]
impl MessageSender for DryRunSender {
    async fn send_to_channel(
        &self,
        channel_id: &str,
        payload: &OutgoingPayload,
    ) -> Result<(), SendError> {
        self.log(channel_id, false, payload);
        Ok(())
    }

    async fn send_dm(&self, user_id: &str, payload: &OutgoingPayload) -> Result<(), SendError> {
        self.log(user_id, true, payload);
        Ok(())
    }
}
