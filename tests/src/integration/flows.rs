//! # Dispatch Flows
//!
//! Admin console request → gateway middleware → DispatchEngine → adapters.
//!
//! ## Flows Tested:
//!
//! 1. **All guilds**: one representative channel per guild, guilds without a
//!    sendable channel skipped
//! 2. **Guild channels with attachment**: image normalized once and attached
//!    to every send, history appended to a JSONL file
//! 3. **Direct messages**: banned users dropped, per-target failures counted
//! 4. **Single-channel composer**: smaller attachment ceiling
//! 5. **Directory refresh**: file-backed directory re-read per dispatch

#[cfg(test)]
mod tests {
    use super::super::support::*;
    use axum::http::StatusCode;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use hd_01_broadcast_dispatch::{
        DispatchEngine, InMemoryDirectory, InMemoryHistoryStore, JsonFileDirectory,
        JsonlHistoryStore, MediaLimits, RecordingSender,
    };
    use shared_types::{SendErrorKind, TargetKind};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    // =============================================================================
    // BROADCAST FLOWS
    // =============================================================================

    #[tokio::test]
    async fn test_all_guilds_broadcast_reaches_first_sendable_channels() {
        let h = harness(RecordingSender::new());

        let res = h
            .router
            .clone()
            .oneshot(post_json(
                "/api/admin/broadcast",
                &verified_cookie(),
                serde_json::json!({
                    "title": "Maintenance",
                    "body": "Back in 10 minutes",
                    "mentionPolicy": "everyone",
                    "targetType": "all_guilds"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            json_body(res).await,
            serde_json::json!({"success": true, "sent": 2, "failed": 0})
        );

        let mut targets: Vec<_> = h.sender.sent().into_iter().map(|m| m.target_id).collect();
        targets.sort();
        assert_eq!(targets, vec!["g1-announce", "g2-news"]);

        let content = &h.sender.sent()[0].content;
        assert_eq!(content, "@everyone\n**Maintenance**\nBack in 10 minutes");

        h.history.wait_for(1).await;
        let record = &h.history.records()[0];
        assert_eq!(record.target_type, TargetKind::AllGuilds);
        assert_eq!(record.sent_count, 2);
    }

    #[tokio::test]
    async fn test_guild_channels_with_image_and_file_history() {
        let dir = tempfile::tempdir().unwrap();
        let directory_file = dir.path().join("directory.json");
        let history_file = dir.path().join("history.jsonl");
        std::fs::write(&directory_file, serde_json::to_vec(&directory()).unwrap()).unwrap();

        let sender = Arc::new(RecordingSender::new());
        let history = Arc::new(JsonlHistoryStore::new(&history_file));
        let engine = DispatchEngine::new(
            Arc::new(JsonFileDirectory::new(&directory_file)),
            Arc::clone(&sender),
            Arc::clone(&history),
        );
        let router = gateway(gateway_config(), engine);

        let image = format!(
            "data:image/png;base64,{}",
            STANDARD.encode(translucent_png(16, 16))
        );
        let res = router
            .oneshot(post_json(
                "/api/admin/broadcast",
                &verified_cookie(),
                serde_json::json!({
                    "body": "New emotes!",
                    "image": image,
                    "mentionPolicy": "here",
                    "targetType": "guild_channels",
                    "guildIds": ["g1", "g2"],
                    "channelIds": ["g1-announce", "g1-mods", "g2-news", "unknown"]
                }),
            ))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            json_body(res).await,
            serde_json::json!({"success": true, "sent": 2, "failed": 0})
        );
        assert!(sender.sent().iter().all(|m| m.has_image));

        // History is appended on a spawned task.
        let mut records = Vec::new();
        for _ in 0..50 {
            records = history.read_all().await.unwrap();
            if !records.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].target_type, TargetKind::GuildChannels);
        assert_eq!(records[0].body_preview, "New emotes!");
    }

    #[tokio::test]
    async fn test_direct_messages_skip_banned_and_count_failures() {
        let h = harness(RecordingSender::new().fail_target("u3", SendErrorKind::Forbidden));

        let res = h
            .router
            .oneshot(post_json(
                "/api/admin/broadcast",
                &verified_cookie(),
                serde_json::json!({
                    "body": "Your report was reviewed",
                    "mentionPolicy": "everyone",
                    "targetType": "users",
                    "userIds": ["u1", "u2", "u3", "u1"]
                }),
            ))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            json_body(res).await,
            serde_json::json!({"success": true, "sent": 1, "failed": 1})
        );

        let sent = h.sender.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].direct);
        assert_eq!(sent[0].content, "Your report was reviewed");
    }

    #[tokio::test]
    async fn test_every_target_failing_is_not_success() {
        let h = harness(
            RecordingSender::new()
                .fail_target("g1-announce", SendErrorKind::Network)
                .fail_target("g2-news", SendErrorKind::RateLimited),
        );

        let res = h
            .router
            .oneshot(post_json(
                "/api/admin/broadcast",
                &verified_cookie(),
                serde_json::json!({"body": "hi", "targetType": "all_guilds"}),
            ))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            json_body(res).await,
            serde_json::json!({"success": false, "sent": 0, "failed": 2})
        );
    }

    #[tokio::test]
    async fn test_only_unsendable_channels_sends_nothing() {
        let h = harness(RecordingSender::new());

        let res = h
            .router
            .oneshot(post_json(
                "/api/admin/broadcast",
                &verified_cookie(),
                serde_json::json!({
                    "body": "hi",
                    "targetType": "guild_channels",
                    "guildIds": ["g3"],
                    "channelIds": ["g3-locked"]
                }),
            ))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(h.sender.sent().is_empty());
        assert!(h.history.is_empty());
    }

    // =============================================================================
    // SINGLE-CHANNEL COMPOSER
    // =============================================================================

    #[tokio::test]
    async fn test_message_image_uses_message_ceiling() {
        let sender = Arc::new(RecordingSender::new());
        let png = translucent_png(32, 32);
        let engine = DispatchEngine::new(
            Arc::new(InMemoryDirectory::new(directory())),
            Arc::clone(&sender),
            Arc::new(InMemoryHistoryStore::new()),
        )
        .with_media_limits(MediaLimits {
            message_max_bytes: png.len() - 1,
            ..MediaLimits::default()
        });
        let router = gateway(gateway_config(), engine);

        let res = router
            .clone()
            .oneshot(post_json(
                "/api/admin/messages",
                &verified_cookie(),
                serde_json::json!({
                    "channelId": "g2-news",
                    "content": "screenshot",
                    "image": STANDARD.encode(&png)
                }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);

        // The same image fits the broadcast ceiling.
        let res = router
            .oneshot(post_json(
                "/api/admin/broadcast",
                &verified_cookie(),
                serde_json::json!({
                    "body": "screenshot",
                    "image": STANDARD.encode(&png),
                    "targetType": "all_guilds"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(sender.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_message_to_unsendable_channel_is_rejected() {
        let h = harness(RecordingSender::new());

        let res = h
            .router
            .oneshot(post_json(
                "/api/admin/messages",
                &verified_cookie(),
                serde_json::json!({"channelId": "g1-mods", "content": "hi"}),
            ))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(h.sender.sent().is_empty());
    }

    // =============================================================================
    // DIRECTORY REFRESH
    // =============================================================================

    #[tokio::test]
    async fn test_file_directory_changes_apply_to_next_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let directory_file = dir.path().join("directory.json");
        std::fs::write(&directory_file, serde_json::to_vec(&directory()).unwrap()).unwrap();

        let sender = Arc::new(RecordingSender::new());
        let engine = DispatchEngine::new(
            Arc::new(JsonFileDirectory::new(&directory_file)),
            Arc::clone(&sender),
            Arc::new(InMemoryHistoryStore::new()),
        );
        let router = gateway(gateway_config(), engine);
        let body = serde_json::json!({"body": "hi", "targetType": "all_guilds"});

        let first = router
            .clone()
            .oneshot(post_json("/api/admin/broadcast", &verified_cookie(), body.clone()))
            .await
            .unwrap();
        assert_eq!(json_body(first).await["sent"], 2);

        let mut updated = directory();
        updated.guilds.push(guild("g4", vec![channel("g4-general", true)]));
        std::fs::write(&directory_file, serde_json::to_vec(&updated).unwrap()).unwrap();

        let second = router
            .oneshot(post_json("/api/admin/broadcast", &verified_cookie(), body))
            .await
            .unwrap();
        assert_eq!(json_body(second).await["sent"], 3);
    }

    #[tokio::test]
    async fn test_missing_directory_file_is_bad_gateway() {
        let dir = tempfile::tempdir().unwrap();
        let engine = DispatchEngine::new(
            Arc::new(JsonFileDirectory::new(dir.path().join("absent.json"))),
            Arc::new(RecordingSender::new()),
            Arc::new(InMemoryHistoryStore::new()),
        );
        let router = gateway(gateway_config(), engine);

        let res = router
            .oneshot(post_json(
                "/api/admin/broadcast",
                &verified_cookie(),
                serde_json::json!({"body": "hi", "targetType": "all_guilds"}),
            ))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    }
}
