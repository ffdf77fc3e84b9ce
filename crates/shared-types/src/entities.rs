//! # Core Domain Entities
//!
//! Defines the entities the broadcast subsystem operates on.
//!
//! ## Clusters
//!
//! - **Directory**: `Guild`, `Channel`, `User`, `Directory`
//! - **Request**: `TargetSpec`, `MentionPolicy`, `BroadcastRequest`
//! - **Result**: `DispatchOutcome`, `BroadcastResult`, `HistoryRecord`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ValidationError;

/// Maximum characters in a composed chat message.
pub const MAX_CONTENT_CHARS: usize = 2000;

/// Maximum characters of the body kept in a history record.
pub const HISTORY_PREVIEW_CHARS: usize = 200;

// =============================================================================
// CLUSTER A: THE DIRECTORY
// =============================================================================

/// Identifier of a guild (server).
pub type GuildId = String;

/// Identifier of a channel.
pub type ChannelId = String;

/// Identifier of a user.
pub type UserId = String;

/// Kind of a guild channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    #[default]
    Text,
    Voice,
    Stage,
}

/// A channel inside a guild, with the bot's send permission already evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: ChannelId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ChannelKind,
    /// Whether the bot's permission grant includes message-send rights.
    pub can_send: bool,
}

/// A guild (server) and its channels in directory order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guild {
    pub id: GuildId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub channels: Vec<Channel>,
}

impl Guild {
    /// Channels the bot may post in, in directory order.
    pub fn sendable_channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter().filter(|c| c.can_send)
    }

    /// First sendable channel, used as the guild's representative target.
    pub fn first_sendable_channel(&self) -> Option<&Channel> {
        self.sendable_channels().next()
    }
}

/// A user reachable by direct message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub is_banned: bool,
}

/// Point-in-time snapshot of the directory service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directory {
    #[serde(default)]
    pub guilds: Vec<Guild>,
    #[serde(default)]
    pub users: Vec<User>,
}

impl Directory {
    pub fn new(guilds: Vec<Guild>, users: Vec<User>) -> Self {
        Self { guilds, users }
    }

    pub fn guild(&self, id: &str) -> Option<&Guild> {
        self.guilds.iter().find(|g| g.id == id)
    }

    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }
}

// =============================================================================
// CLUSTER B: THE REQUEST
// =============================================================================

/// Which family of targets a broadcast addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    AllGuilds,
    GuildChannels,
    Users,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::AllGuilds => "all_guilds",
            TargetKind::GuildChannels => "guild_channels",
            TargetKind::Users => "users",
        }
    }
}

/// Target specification. Exactly one variant per broadcast.
///
/// On the wire the variant is selected by `targetType`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "targetType", rename_all = "snake_case")]
pub enum TargetSpec {
    /// One representative channel in every guild.
    AllGuilds,
    /// Explicit channels across chosen guilds. A guild with no listed channel
    /// selects all of its sendable channels.
    GuildChannels {
        #[serde(rename = "guildIds", default)]
        guild_ids: Vec<GuildId>,
        #[serde(rename = "channelIds", default)]
        channel_ids: Vec<ChannelId>,
    },
    /// Direct messages to chosen users.
    Users {
        #[serde(rename = "userIds", default)]
        user_ids: Vec<UserId>,
    },
}

impl TargetSpec {
    pub fn kind(&self) -> TargetKind {
        match self {
            TargetSpec::AllGuilds => TargetKind::AllGuilds,
            TargetSpec::GuildChannels { .. } => TargetKind::GuildChannels,
            TargetSpec::Users { .. } => TargetKind::Users,
        }
    }

    /// Whether this spec needs the guild/channel half of the directory.
    pub fn needs_guilds(&self) -> bool {
        !matches!(self, TargetSpec::Users { .. })
    }
}

/// Mention marker prepended to channel broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MentionPolicy {
    #[default]
    None,
    Everyone,
    Here,
}

impl MentionPolicy {
    pub fn marker(&self) -> Option<&'static str> {
        match self {
            MentionPolicy::None => None,
            MentionPolicy::Everyone => Some("@everyone"),
            MentionPolicy::Here => Some("@here"),
        }
    }
}

/// One logical message to fan out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastRequest {
    pub title: Option<String>,
    pub body: String,
    /// Raw image bytes, already transport-decoded.
    pub image: Option<Vec<u8>>,
    pub mention_policy: MentionPolicy,
    pub target_spec: TargetSpec,
}

impl BroadcastRequest {
    pub fn new(body: impl Into<String>, target_spec: TargetSpec) -> Self {
        Self {
            title: None,
            body: body.into(),
            image: None,
            mention_policy: MentionPolicy::None,
            target_spec,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_image(mut self, image: Vec<u8>) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_mention(mut self, policy: MentionPolicy) -> Self {
        self.mention_policy = policy;
        self
    }

    /// Title, treating a blank string as absent.
    pub fn title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Check the request invariants before any network effect.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.body.trim().is_empty() {
            return Err(ValidationError::EmptyBody);
        }

        match &self.target_spec {
            TargetSpec::Users { user_ids } if user_ids.is_empty() => {
                Err(ValidationError::EmptyUserIds)
            }
            TargetSpec::GuildChannels { guild_ids, .. } if guild_ids.is_empty() => {
                Err(ValidationError::EmptyGuildIds)
            }
            _ => Ok(()),
        }
    }
}

// =============================================================================
// CLUSTER C: THE RESULT
// =============================================================================

/// Why a single send failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendErrorKind {
    Forbidden,
    NotFound,
    RateLimited,
    Network,
    Timeout,
    Other,
}

/// Outcome of one target's send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOutcome {
    pub target_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<SendErrorKind>,
}

impl DispatchOutcome {
    pub fn sent(target_id: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            success: true,
            error_kind: None,
        }
    }

    pub fn failed(target_id: impl Into<String>, kind: SendErrorKind) -> Self {
        Self {
            target_id: target_id.into(),
            success: false,
            error_kind: Some(kind),
        }
    }
}

/// Aggregate of a fan-out. Counts are derived from `outcomes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastResult {
    pub sent_count: usize,
    pub failed_count: usize,
    pub timestamp: DateTime<Utc>,
    pub outcomes: Vec<DispatchOutcome>,
}

impl BroadcastResult {
    pub fn from_outcomes(outcomes: Vec<DispatchOutcome>, timestamp: DateTime<Utc>) -> Self {
        let sent_count = outcomes.iter().filter(|o| o.success).count();
        Self {
            sent_count,
            failed_count: outcomes.len() - sent_count,
            timestamp,
            outcomes,
        }
    }

    /// At least one target received the message.
    pub fn is_success(&self) -> bool {
        self.sent_count > 0
    }
}

/// Trimmed form of a broadcast kept by the history store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub body_preview: String,
    pub target_type: TargetKind,
    pub sent_count: usize,
    pub failed_count: usize,
    pub timestamp: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn trimmed(request: &BroadcastRequest, result: &BroadcastResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: request.title().map(str::to_string),
            body_preview: request.body.chars().take(HISTORY_PREVIEW_CHARS).collect(),
            target_type: request.target_spec.kind(),
            sent_count: result.sent_count,
            failed_count: result.failed_count,
            timestamp: result.timestamp,
        }
    }
}
