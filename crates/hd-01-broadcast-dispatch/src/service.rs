//! Dispatch Engine
//!
//! Orchestrates resolution, media normalization and the concurrent fan-out,
//! and implements the `BroadcastApi` port using injected dependencies.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use shared_types::{
    BroadcastRequest, BroadcastResult, Directory, DispatchOutcome, HistoryRecord, TargetSpec,
    ValidationError,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::{
    check_length, compose_content, normalize_with_quality, resolve, resolve_channel,
    DeliveryTarget, DirectoryError, DispatchError, MediaError, MediaLimits, OutgoingPayload,
    ResolvedTargets, SendError, UploadFlow,
};
use crate::ports::{
    BroadcastApi, ChannelMessage, DirectoryProvider, HistoryStore, MessageSender,
    SystemTimeSource, TimeSource,
};

/// Default number of sends in flight at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Default per-target send timeout.
pub const DEFAULT_SEND_TIMEOUT_SECS: u64 = 15;

/// Fan-out tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Upper bound on concurrent sends.
    pub max_concurrency: usize,
    /// Per-target send timeout. `None` waits indefinitely.
    pub send_timeout_secs: Option<u64>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            send_timeout_secs: Some(DEFAULT_SEND_TIMEOUT_SECS),
        }
    }
}

impl DispatchConfig {
    pub fn send_timeout(&self) -> Option<Duration> {
        self.send_timeout_secs.map(Duration::from_secs)
    }
}

/// Broadcast dispatch service.
pub struct DispatchEngine<D, S, H>
where
    D: DirectoryProvider,
    S: MessageSender,
    H: HistoryStore,
{
    directory: Arc<D>,
    sender: Arc<S>,
    history: Arc<H>,
    config: DispatchConfig,
    media_limits: MediaLimits,
    clock: Arc<dyn TimeSource>,
}

impl<D, S, H> DispatchEngine<D, S, H>
where
    D: DirectoryProvider,
    S: MessageSender,
    H: HistoryStore + 'static,
{
    pub fn new(directory: Arc<D>, sender: Arc<S>, history: Arc<H>) -> Self {
        Self {
            directory,
            sender,
            history,
            config: DispatchConfig::default(),
            media_limits: MediaLimits::default(),
            clock: Arc::new(SystemTimeSource),
        }
    }

    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_media_limits(mut self, limits: MediaLimits) -> Self {
        self.media_limits = limits;
        self
    }

    pub fn with_time_source(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Fetch only the half of the directory the target family needs.
    async fn snapshot(&self, spec: &TargetSpec) -> Result<Directory, DirectoryError> {
        if spec.needs_guilds() {
            let guilds = self.directory.list_guilds_with_channels().await?;
            Ok(Directory::new(guilds, Vec::new()))
        } else {
            let users = self.directory.list_users().await?;
            Ok(Directory::new(Vec::new(), users))
        }
    }

    /// Attach the normalized image, if any. Decoding runs off the async workers.
    async fn build_payload(
        &self,
        content: String,
        image: Option<Vec<u8>>,
        flow: UploadFlow,
    ) -> Result<OutgoingPayload, MediaError> {
        let payload = OutgoingPayload::text(content);
        let Some(raw) = image else {
            return Ok(payload);
        };

        let max_bytes = self.media_limits.max_bytes(flow);
        let quality = self.media_limits.jpeg_quality;
        let normalized =
            tokio::task::spawn_blocking(move || normalize_with_quality(&raw, max_bytes, quality))
                .await
                .map_err(|e| MediaError::Encode(format!("normalization task failed: {e}")))??;

        debug!(
            width = normalized.width,
            height = normalized.height,
            bytes = normalized.len(),
            "Attachment normalized"
        );
        Ok(payload.with_image(normalized))
    }

    /// Send to every target, at most `max_concurrency` at a time.
    ///
    /// A failed send is recorded and never stops the others.
    async fn fan_out(
        &self,
        targets: ResolvedTargets,
        payload: OutgoingPayload,
    ) -> Vec<DispatchOutcome> {
        let payload = &payload;
        stream::iter(targets)
            .map(|target| async move {
                match self.send_one(&target, payload).await {
                    Ok(()) => DispatchOutcome::sent(target.id()),
                    Err(e) => {
                        warn!(
                            target_id = target.id(),
                            error_kind = ?e.kind,
                            error = %e.message,
                            "Send failed"
                        );
                        DispatchOutcome::failed(target.id(), e.kind)
                    }
                }
            })
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect()
            .await
    }

    async fn send_one(
        &self,
        target: &DeliveryTarget,
        payload: &OutgoingPayload,
    ) -> Result<(), SendError> {
        let send = async {
            match target {
                DeliveryTarget::Channel { channel_id, .. } => {
                    self.sender.send_to_channel(channel_id, payload).await
                }
                DeliveryTarget::DirectMessage { user_id } => {
                    self.sender.send_dm(user_id, payload).await
                }
            }
        };

        match self.config.send_timeout() {
            Some(limit) => tokio::time::timeout(limit, send)
                .await
                .unwrap_or_else(|_| Err(SendError::timeout(limit))),
            None => send.await,
        }
    }

    /// Append to history on a detached task. Failures are logged only.
    fn record_history(&self, record: HistoryRecord) {
        let history = Arc::clone(&self.history);
        tokio::spawn(async move {
            let id = record.id;
            if let Err(e) = history.append(record).await {
                warn!(history_id = %id, error = %e, "History write failed");
            }
        });
    }
}

#[async_trait]
impl<D, S, H> BroadcastApi for DispatchEngine<D, S, H>
where
    D: DirectoryProvider + 'static,
    S: MessageSender + 'static,
    H: HistoryStore + 'static,
{
    async fn dispatch(
        &self,
        mut request: BroadcastRequest,
    ) -> Result<BroadcastResult, DispatchError> {
        request.validate()?;
        let content = compose_content(&request)?;

        let directory = self.snapshot(&request.target_spec).await?;
        let targets = resolve(&request.target_spec, &directory)?;
        let target_count = targets.len();

        let payload = self
            .build_payload(content, request.image.take(), UploadFlow::Broadcast)
            .await?;

        let outcomes = self.fan_out(targets, payload).await;
        let result = BroadcastResult::from_outcomes(outcomes, self.clock.now());

        info!(
            target_kind = request.target_spec.kind().as_str(),
            targets = target_count,
            sent = result.sent_count,
            failed = result.failed_count,
            "Broadcast dispatched"
        );

        self.record_history(HistoryRecord::trimmed(&request, &result));
        Ok(result)
    }

    async fn send_message(
        &self,
        message: ChannelMessage,
    ) -> Result<BroadcastResult, DispatchError> {
        if message.content.trim().is_empty() {
            return Err(ValidationError::EmptyBody.into());
        }
        check_length(&message.content)?;

        let guilds = self.directory.list_guilds_with_channels().await?;
        let targets = resolve_channel(&message.channel_id, &guilds)?;

        let payload = self
            .build_payload(message.content, message.image, UploadFlow::Message)
            .await?;

        let outcomes = self.fan_out(targets, payload).await;
        let result = BroadcastResult::from_outcomes(outcomes, self.clock.now());

        info!(
            channel_id = %message.channel_id,
            sent = result.sent_count,
            failed = result.failed_count,
            "Channel message sent"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryDirectory, InMemoryHistoryStore, RecordingSender};
    use crate::domain::ResolutionError;
    use crate::ports::FixedTimeSource;
    use chrono::{TimeZone, Utc};
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use shared_types::{
        Channel, ChannelKind, Guild, MentionPolicy, SendErrorKind, TargetKind, User,
    };
    use std::collections::HashSet;
    use std::io::Cursor;

    type Engine = DispatchEngine<InMemoryDirectory, RecordingSender, InMemoryHistoryStore>;

    fn channel(id: &str, can_send: bool) -> Channel {
        Channel {
            id: id.into(),
            name: id.into(),
            kind: ChannelKind::Text,
            can_send,
        }
    }

    fn guild(id: &str, channels: Vec<Channel>) -> Guild {
        Guild {
            id: id.into(),
            name: id.into(),
            channels,
        }
    }

    fn user(id: &str, is_banned: bool) -> User {
        User {
            id: id.into(),
            username: id.into(),
            is_banned,
        }
    }

    fn directory() -> Directory {
        Directory::new(
            vec![
                guild("g1", vec![channel("c1", true), channel("c2", false)]),
                guild("g2", vec![channel("c3", true), channel("c4", true)]),
                guild("g3", vec![channel("c5", true)]),
            ],
            vec![user("u1", false), user("u2", true), user("u3", false)],
        )
    }

    struct Harness {
        engine: Engine,
        directory: Arc<InMemoryDirectory>,
        sender: Arc<RecordingSender>,
        history: Arc<InMemoryHistoryStore>,
    }

    fn harness_with(sender: RecordingSender, history: InMemoryHistoryStore) -> Harness {
        let directory = Arc::new(InMemoryDirectory::new(directory()));
        let sender = Arc::new(sender);
        let history = Arc::new(history);
        let engine = DispatchEngine::new(directory.clone(), sender.clone(), history.clone());
        Harness {
            engine,
            directory,
            sender,
            history,
        }
    }

    fn harness() -> Harness {
        harness_with(RecordingSender::new(), InMemoryHistoryStore::new())
    }

    fn users(ids: &[&str]) -> TargetSpec {
        TargetSpec::Users {
            user_ids: ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn png() -> Vec<u8> {
        let img = RgbaImage::from_pixel(4, 4, Rgba([0, 128, 255, 64]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[tokio::test]
    async fn test_partial_failure_is_counted_not_aborted() {
        let h = harness_with(
            RecordingSender::new().fail_target("c3", SendErrorKind::Forbidden),
            InMemoryHistoryStore::new(),
        );

        let result = h
            .engine
            .dispatch(BroadcastRequest::new("hello", TargetSpec::AllGuilds))
            .await
            .unwrap();

        assert_eq!(result.sent_count, 2);
        assert_eq!(result.failed_count, 1);
        assert_eq!(result.outcomes.len(), 3);
        assert!(result.is_success());

        let failed: Vec<_> = result.outcomes.iter().filter(|o| !o.success).collect();
        assert_eq!(failed[0].target_id, "c3");
        assert_eq!(failed[0].error_kind, Some(SendErrorKind::Forbidden));
    }

    #[tokio::test]
    async fn test_all_guilds_sends_once_per_guild() {
        let h = harness();
        h.engine
            .dispatch(BroadcastRequest::new("hello", TargetSpec::AllGuilds))
            .await
            .unwrap();

        let sent: HashSet<_> = h.sender.sent().into_iter().map(|m| m.target_id).collect();
        let expected: HashSet<_> = ["c1", "c3", "c5"].iter().map(|s| s.to_string()).collect();
        assert_eq!(sent, expected);
    }

    #[tokio::test]
    async fn test_validation_fails_before_any_effect() {
        let h = harness();
        let err = h
            .engine
            .dispatch(BroadcastRequest::new("", TargetSpec::AllGuilds))
            .await
            .unwrap_err();

        assert_eq!(err, DispatchError::Validation(ValidationError::EmptyBody));
        assert_eq!(h.directory.guild_queries(), 0);
        assert!(h.sender.sent().is_empty());
    }

    #[tokio::test]
    async fn test_empty_target_set_rejects_dispatch() {
        let h = harness();
        let err = h.engine.dispatch(BroadcastRequest::new("hi", users(&["u2"]))).await;

        assert_eq!(
            err.unwrap_err(),
            DispatchError::Resolution(ResolutionError::EmptyTargetSet)
        );
        assert!(h.sender.sent().is_empty());
    }

    #[tokio::test]
    async fn test_users_query_only_user_directory() {
        let h = harness();
        let result = h
            .engine
            .dispatch(
                BroadcastRequest::new("hi", users(&["u1", "u2", "u3"]))
                    .with_mention(MentionPolicy::Everyone),
            )
            .await
            .unwrap();

        assert_eq!(result.sent_count, 2);
        assert_eq!(h.directory.guild_queries(), 0);
        assert_eq!(h.directory.user_queries(), 1);

        // No mention marker in direct messages.
        for message in h.sender.sent() {
            assert!(message.direct);
            assert_eq!(message.content, "hi");
        }
    }

    #[tokio::test]
    async fn test_mention_and_title_reach_channels() {
        let h = harness();
        h.engine
            .dispatch(
                BroadcastRequest::new(
                    "body",
                    TargetSpec::GuildChannels {
                        guild_ids: vec!["g1".into()],
                        channel_ids: vec![],
                    },
                )
                .with_title("News")
                .with_mention(MentionPolicy::Here),
            )
            .await
            .unwrap();

        let sent = h.sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].content, "@here\n**News**\nbody");
    }

    #[tokio::test]
    async fn test_bad_image_blocks_dispatch() {
        let h = harness();
        let err = h
            .engine
            .dispatch(
                BroadcastRequest::new("hi", TargetSpec::AllGuilds).with_image(b"not-an-image".to_vec()),
            )
            .await
            .unwrap_err();

        assert_eq!(err, DispatchError::Media(MediaError::UnsupportedFormat));
        assert!(h.sender.sent().is_empty());
    }

    #[tokio::test]
    async fn test_image_attached_to_every_target() {
        let h = harness();
        h.engine
            .dispatch(BroadcastRequest::new("hi", TargetSpec::AllGuilds).with_image(png()))
            .await
            .unwrap();

        let sent = h.sender.sent();
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|m| m.has_image));
    }

    #[tokio::test]
    async fn test_history_written_with_trimmed_record() {
        let h = harness();
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let engine = h.engine.with_time_source(Arc::new(FixedTimeSource(at)));

        let result = engine
            .dispatch(BroadcastRequest::new("x".repeat(500), TargetSpec::AllGuilds).with_title("T"))
            .await
            .unwrap();
        assert_eq!(result.timestamp, at);

        h.history.wait_for(1).await;
        let record = &h.history.records()[0];
        assert_eq!(record.body_preview.len(), 200);
        assert_eq!(record.target_type, TargetKind::AllGuilds);
        assert_eq!(record.sent_count, 3);
        assert_eq!(record.timestamp, at);
    }

    #[tokio::test]
    async fn test_history_failure_does_not_change_result() {
        let h = harness_with(RecordingSender::new(), InMemoryHistoryStore::failing());
        let result = h
            .engine
            .dispatch(BroadcastRequest::new("hi", TargetSpec::AllGuilds))
            .await
            .unwrap();

        assert_eq!(result.sent_count, 3);
        tokio::task::yield_now().await;
        assert!(h.history.is_empty());
    }

    #[tokio::test]
    async fn test_directory_outage_surfaces() {
        let h = harness();
        h.directory.set_unavailable(true);
        let err = h
            .engine
            .dispatch(BroadcastRequest::new("hi", TargetSpec::AllGuilds))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Directory(_)));
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let guilds = (0..20)
            .map(|i| guild(&format!("g{i}"), vec![channel(&format!("c{i}"), true)]))
            .collect();
        let directory = Arc::new(InMemoryDirectory::new(Directory::new(guilds, vec![])));
        let sender = Arc::new(RecordingSender::new().with_delay(Duration::from_millis(20)));
        let engine = DispatchEngine::new(
            directory,
            sender.clone(),
            Arc::new(InMemoryHistoryStore::new()),
        )
        .with_config(DispatchConfig {
            max_concurrency: 4,
            send_timeout_secs: None,
        });

        let result = engine
            .dispatch(BroadcastRequest::new("hi", TargetSpec::AllGuilds))
            .await
            .unwrap();

        assert_eq!(result.sent_count, 20);
        assert!(sender.max_in_flight() <= 4);
        assert!(sender.max_in_flight() > 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_send_times_out() {
        let h = harness_with(
            RecordingSender::new().with_delay(Duration::from_secs(60)),
            InMemoryHistoryStore::new(),
        );
        let engine = h.engine.with_config(DispatchConfig {
            max_concurrency: 8,
            send_timeout_secs: Some(1),
        });

        let result = engine
            .dispatch(BroadcastRequest::new("hi", users(&["u1"])))
            .await
            .unwrap();

        assert_eq!(result.failed_count, 1);
        assert_eq!(result.outcomes[0].error_kind, Some(SendErrorKind::Timeout));
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn test_send_message_to_one_channel() {
        let h = harness();
        let result = h
            .engine
            .send_message(ChannelMessage::new("c4", "direct post"))
            .await
            .unwrap();

        assert_eq!(result.sent_count, 1);
        assert_eq!(h.sender.sent()[0].target_id, "c4");
        assert_eq!(h.sender.sent()[0].content, "direct post");
    }

    #[tokio::test]
    async fn test_send_message_rejects_unsendable_channel() {
        let h = harness();
        let err = h
            .engine
            .send_message(ChannelMessage::new("c2", "nope"))
            .await
            .unwrap_err();
        assert_eq!(err, DispatchError::Resolution(ResolutionError::EmptyTargetSet));
    }

    #[tokio::test]
    async fn test_send_message_uses_message_ceiling() {
        let h = harness();
        let engine = h.engine.with_media_limits(MediaLimits {
            message_max_bytes: 16,
            ..MediaLimits::default()
        });

        let err = engine
            .send_message(ChannelMessage::new("c1", "pic").with_image(png()))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Media(MediaError::TooLarge { max: 16, .. })));

        // The broadcast flow keeps its own ceiling.
        assert!(engine
            .dispatch(BroadcastRequest::new("pic", TargetSpec::AllGuilds).with_image(png()))
            .await
            .is_ok());
    }
}
