//! HTTP request and response bodies.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hd_01_broadcast_dispatch::{ChannelMessage, MediaError};
use serde::{Deserialize, Serialize};
use shared_types::{BroadcastRequest, BroadcastResult, MentionPolicy, TargetSpec};

/// `POST /api/admin/broadcast` body.
///
/// ```json
/// {"title": "Patch notes", "body": "...", "mentionPolicy": "here",
///  "targetType": "guild_channels", "guildIds": ["g1"], "channelIds": ["c1"]}
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastBody {
    #[serde(default)]
    pub title: Option<String>,
    pub body: String,
    /// Base64 or `data:` URL
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub mention_policy: MentionPolicy,
    #[serde(flatten)]
    pub target: TargetSpec,
}

impl BroadcastBody {
    pub fn into_request(self) -> Result<BroadcastRequest, MediaError> {
        let image = decode_optional_image(self.image.as_deref())?;

        let mut request =
            BroadcastRequest::new(self.body, self.target).with_mention(self.mention_policy);
        if let Some(title) = self.title {
            request = request.with_title(title);
        }
        if let Some(image) = image {
            request = request.with_image(image);
        }
        Ok(request)
    }
}

/// `POST /api/admin/messages` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBody {
    pub channel_id: String,
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl MessageBody {
    pub fn into_message(self) -> Result<ChannelMessage, MediaError> {
        let image = decode_optional_image(self.image.as_deref())?;

        let message = ChannelMessage::new(self.channel_id, self.content);
        Ok(match image {
            Some(image) => message.with_image(image),
            None => message,
        })
    }
}

/// Response for both dispatch routes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResponse {
    pub success: bool,
    pub sent: usize,
    pub failed: usize,
}

impl From<&BroadcastResult> for DispatchResponse {
    fn from(result: &BroadcastResult) -> Self {
        Self {
            success: result.is_success(),
            sent: result.sent_count,
            failed: result.failed_count,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Decode an image field: plain base64 or `data:<mime>;base64,<data>`.
pub fn decode_image_payload(encoded: &str) -> Result<Vec<u8>, MediaError> {
    let encoded = encoded.trim();

    let data = match encoded.strip_prefix("data:") {
        Some(rest) => {
            let (meta, data) = rest.split_once(',').ok_or(MediaError::InvalidEncoding)?;
            if !meta.ends_with(";base64") {
                return Err(MediaError::InvalidEncoding);
            }
            data
        }
        None => encoded,
    };

    STANDARD
        .decode(data)
        .map_err(|_| MediaError::InvalidEncoding)
}

/// Blank fields count as no image.
fn decode_optional_image(encoded: Option<&str>) -> Result<Option<Vec<u8>>, MediaError> {
    match encoded {
        Some(value) if !value.trim().is_empty() => decode_image_payload(value).map(Some),
        _ => Ok(None),
    }
}
