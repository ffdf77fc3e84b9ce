//! # Inbound Port - BroadcastApi
//!
//! Driving port used by the admin gateway.
//!
//! | Method | Flow | Image ceiling |
//! |--------|------|---------------|
//! | `dispatch` | Broadcast to a target family | `MediaLimits::broadcast_max_bytes` |
//! | `send_message` | Single-channel composer | `MediaLimits::message_max_bytes` |

use async_trait::async_trait;
use shared_types::{BroadcastRequest, BroadcastResult, ChannelId};

use crate::domain::DispatchError;

/// A one-off message to a single channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub channel_id: ChannelId,
    pub content: String,
    /// Raw image bytes, already transport-decoded.
    pub image: Option<Vec<u8>>,
}

impl ChannelMessage {
    pub fn new(channel_id: impl Into<ChannelId>, content: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            content: content.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: Vec<u8>) -> Self {
        self.image = Some(image);
        self
    }
}

/// Primary API of the broadcast dispatch subsystem.
///
/// # Errors
///
/// Both methods fail as a whole only when nothing was sent: validation,
/// empty target set, rejected attachment, or an unavailable directory.
/// Per-target send failures are reported inside the `BroadcastResult`.
#[async_trait]
pub trait BroadcastApi: Send + Sync {
    /// Fan one logical message out to every resolved target.
    async fn dispatch(&self, request: BroadcastRequest) -> Result<BroadcastResult, DispatchError>;

    /// Post to exactly one channel the bot can send in.
    async fn send_message(&self, message: ChannelMessage)
        -> Result<BroadcastResult, DispatchError>;
}
