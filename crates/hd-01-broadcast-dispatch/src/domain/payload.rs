//! Message composition.

use std::sync::Arc;

use shared_types::{BroadcastRequest, ValidationError, MAX_CONTENT_CHARS};

use super::media::NormalizedImage;

/// What every target receives. The image is shared, never re-encoded per target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingPayload {
    pub content: String,
    pub image: Option<Arc<NormalizedImage>>,
}

impl OutgoingPayload {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: NormalizedImage) -> Self {
        self.image = Some(Arc::new(image));
        self
    }
}

/// Build the message text: `[mention "\n"]["**" title "**\n"]body`.
///
/// Direct messages never carry a mention marker.
pub fn compose_content(request: &BroadcastRequest) -> Result<String, ValidationError> {
    let mut content = String::with_capacity(request.body.len() + 32);

    if request.target_spec.needs_guilds() {
        if let Some(marker) = request.mention_policy.marker() {
            content.push_str(marker);
            content.push('\n');
        }
    }

    if let Some(title) = request.title() {
        content.push_str("**");
        content.push_str(title);
        content.push_str("**\n");
    }

    content.push_str(&request.body);
    check_length(&content)?;
    Ok(content)
}

/// Reject text over the platform's message limit.
pub fn check_length(content: &str) -> Result<(), ValidationError> {
    let len = content.chars().count();
    if len > MAX_CONTENT_CHARS {
        return Err(ValidationError::ContentTooLong {
            len,
            max: MAX_CONTENT_CHARS,
        });
    }
    Ok(())
}
