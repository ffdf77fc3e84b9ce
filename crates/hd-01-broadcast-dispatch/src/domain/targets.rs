//! Target resolution.
//!
//! Turns a `TargetSpec` plus a directory snapshot into the concrete,
//! permission-filtered, de-duplicated list of delivery targets.
//!
//! ## Policy
//!
//! | Spec | Rule |
//! |------|------|
//! | `AllGuilds` | First sendable channel of every guild (one message per guild) |
//! | `GuildChannels` | Named channels that are sendable; a guild with no named channel selects all its sendable channels, unless some named id is unknown |
//! | `Users` | Every known, non-banned user |
//!
//! Unknown guild, channel and user ids are dropped. An empty result is an
//! error, never a vacuous success.

use std::collections::{HashMap, HashSet};

use shared_types::{ChannelId, Directory, Guild, GuildId, TargetSpec, UserId};
use tracing::debug;

use super::errors::ResolutionError;

/// A concrete place to deliver one message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeliveryTarget {
    Channel {
        guild_id: GuildId,
        channel_id: ChannelId,
    },
    DirectMessage {
        user_id: UserId,
    },
}

impl DeliveryTarget {
    pub fn channel(guild_id: impl Into<GuildId>, channel_id: impl Into<ChannelId>) -> Self {
        Self::Channel {
            guild_id: guild_id.into(),
            channel_id: channel_id.into(),
        }
    }

    pub fn direct_message(user_id: impl Into<UserId>) -> Self {
        Self::DirectMessage {
            user_id: user_id.into(),
        }
    }

    /// Channel id or user id. Unique across a resolved set.
    pub fn id(&self) -> &str {
        match self {
            Self::Channel { channel_id, .. } => channel_id,
            Self::DirectMessage { user_id } => user_id,
        }
    }

    pub fn is_direct_message(&self) -> bool {
        matches!(self, Self::DirectMessage { .. })
    }
}

/// Targets in first-seen order, unique by `DeliveryTarget::id`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTargets {
    targets: Vec<DeliveryTarget>,
    seen: HashSet<String>,
}

impl ResolvedTargets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a target unless one with the same id is already present.
    pub fn insert(&mut self, target: DeliveryTarget) -> bool {
        if self.seen.insert(target.id().to_string()) {
            self.targets.push(target);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeliveryTarget> {
        self.targets.iter()
    }

    /// Set view of the target ids.
    pub fn ids(&self) -> HashSet<&str> {
        self.targets.iter().map(DeliveryTarget::id).collect()
    }
}

impl IntoIterator for ResolvedTargets {
    type Item = DeliveryTarget;
    type IntoIter = std::vec::IntoIter<DeliveryTarget>;

    fn into_iter(self) -> Self::IntoIter {
        self.targets.into_iter()
    }
}

/// Resolve a spec against a directory snapshot.
pub fn resolve(spec: &TargetSpec, directory: &Directory) -> Result<ResolvedTargets, ResolutionError> {
    let mut resolved = ResolvedTargets::new();

    match spec {
        TargetSpec::AllGuilds => {
            for guild in &directory.guilds {
                match guild.first_sendable_channel() {
                    Some(channel) => {
                        resolved.insert(DeliveryTarget::channel(&guild.id, &channel.id));
                    }
                    None => debug!(guild_id = %guild.id, "Guild has no sendable channel"),
                }
            }
        }
        TargetSpec::GuildChannels {
            guild_ids,
            channel_ids,
        } => {
            let wanted: HashSet<&str> = channel_ids.iter().map(String::as_str).collect();
            let guilds: Vec<&Guild> = guild_ids
                .iter()
                .filter_map(|guild_id| {
                    let guild = directory.guild(guild_id);
                    if guild.is_none() {
                        debug!(guild_id = %guild_id, "Selected guild not in directory");
                    }
                    guild
                })
                .collect();

            // A stale channel id means the selection is out of date; never
            // widen it to whole guilds.
            let stale: Vec<&str> = wanted
                .iter()
                .copied()
                .filter(|id| {
                    !guilds
                        .iter()
                        .any(|guild| guild.channels.iter().any(|c| c.id == *id))
                })
                .collect();
            if !stale.is_empty() {
                debug!(channel_ids = ?stale, "Selected channels not in directory");
            }
            let widen = stale.is_empty();

            for guild in guilds {
                resolve_guild_channels(guild, &wanted, widen, &mut resolved);
            }
        }
        TargetSpec::Users { user_ids } => {
            let users: HashMap<&str, bool> = directory
                .users
                .iter()
                .map(|u| (u.id.as_str(), u.is_banned))
                .collect();

            for user_id in user_ids {
                match users.get(user_id.as_str()).copied() {
                    Some(false) => {
                        resolved.insert(DeliveryTarget::direct_message(user_id));
                    }
                    Some(true) => debug!(user_id = %user_id, "Skipping banned user"),
                    None => debug!(user_id = %user_id, "Selected user not in directory"),
                }
            }
        }
    }

    if resolved.is_empty() {
        return Err(ResolutionError::EmptyTargetSet);
    }
    Ok(resolved)
}

/// Resolve a single channel for the message composer.
pub fn resolve_channel(channel_id: &str, guilds: &[Guild]) -> Result<ResolvedTargets, ResolutionError> {
    let mut resolved = ResolvedTargets::new();

    let found = guilds.iter().find_map(|guild| {
        guild
            .channels
            .iter()
            .find(|c| c.id == channel_id)
            .map(|channel| (guild, channel))
    });

    match found {
        Some((guild, channel)) if channel.can_send => {
            resolved.insert(DeliveryTarget::channel(&guild.id, &channel.id));
            Ok(resolved)
        }
        _ => Err(ResolutionError::EmptyTargetSet),
    }
}

fn resolve_guild_channels(
    guild: &Guild,
    wanted: &HashSet<&str>,
    widen: bool,
    resolved: &mut ResolvedTargets,
) {
    let named: Vec<_> = guild
        .channels
        .iter()
        .filter(|c| wanted.contains(c.id.as_str()))
        .collect();

    if named.is_empty() && widen {
        for channel in guild.sendable_channels() {
            resolved.insert(DeliveryTarget::channel(&guild.id, &channel.id));
        }
        return;
    }

    for channel in named {
        if channel.can_send {
            resolved.insert(DeliveryTarget::channel(&guild.id, &channel.id));
        } else {
            debug!(guild_id = %guild.id, channel_id = %channel.id, "Skipping channel without send permission");
        }
    }
}
