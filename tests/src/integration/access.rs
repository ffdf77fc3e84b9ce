//! # Access Control Flows
//!
//! Rate limiting and the session/MFA gate in front of the dispatch routes,
//! driven through the full router.

#[cfg(test)]
mod tests {
    use super::super::support::*;
    use axum::{
        body::Body,
        extract::ConnectInfo,
        http::{header, Request, StatusCode},
    };
    use hd_01_broadcast_dispatch::{
        DispatchEngine, InMemoryDirectory, InMemoryHistoryStore, RecordingSender,
    };
    use shared_types::{AdminSession, AuthState};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn broadcast(cookie: &str) -> Request<Body> {
        post_json(
            "/api/admin/broadcast",
            cookie,
            serde_json::json!({"body": "hi", "targetType": "all_guilds"}),
        )
    }

    fn get_from(uri: &str, client: &str, cookie: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .extension(ConnectInfo(SocketAddr::new(client.parse().unwrap(), 50_000)))
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    // =============================================================================
    // SESSION / MFA GATE
    // =============================================================================

    #[tokio::test]
    async fn test_mfa_states_over_http() {
        let h = harness(RecordingSender::new());

        let cases = [
            (
                AdminSession::new("a", AuthState::New),
                "",
                Some("/login?flow=setup&mfa_required=true"),
            ),
            (
                AdminSession::new("a", AuthState::MfaRequired),
                "; admin_mfa_verified=false",
                Some("/login?flow=verify&mfa_required=true"),
            ),
            (
                AdminSession::new("a", AuthState::MfaRequired),
                "; admin_mfa_verified=true",
                None,
            ),
            (
                AdminSession::new("a", AuthState::Verified)
                    .with_mfa_methods(vec!["webauthn".into()]),
                "",
                Some("/login?flow=verify&mfa_required=true"),
            ),
            (AdminSession::new("a", AuthState::Verified), "", None),
        ];

        for (session, flag, redirect) in cases {
            let cookie = format!("{}{flag}", session_cookie(&session));
            let res = h.router.clone().oneshot(broadcast(&cookie)).await.unwrap();

            match redirect {
                Some(location) => {
                    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT, "{session:?}");
                    assert_eq!(res.headers()[header::LOCATION], location);
                    assert!(res.headers().get(header::SET_COOKIE).is_none());
                }
                None => assert_eq!(res.status(), StatusCode::OK, "{session:?}"),
            }
            assert_eq!(res.headers()["x-frame-options"], "DENY");
        }

        // Only the two admitted requests reached the sender, two guilds each.
        assert_eq!(h.sender.sent().len(), 4);
    }

    #[tokio::test]
    async fn test_session_signed_with_other_secret_is_cleared() {
        let h = harness(RecordingSender::new());
        let forged = hd_02_admin_gateway::SessionCodec::new("a-different-secret-0123456789abcdef")
            .encode(&AdminSession::new("intruder", AuthState::Verified))
            .unwrap();

        let res = h
            .router
            .oneshot(broadcast(&format!(
                "admin_session={forged}; admin_mfa_verified=true"
            )))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(res.headers()[header::LOCATION], "/login");
        assert_eq!(res.headers().get_all(header::SET_COOKIE).iter().count(), 2);
        assert!(h.sender.sent().is_empty());
    }

    #[tokio::test]
    async fn test_unprotected_paths_skip_the_gate() {
        let h = harness(RecordingSender::new());
        let res = h
            .router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    // =============================================================================
    // RATE LIMITING
    // =============================================================================

    #[tokio::test]
    async fn test_clients_have_independent_budgets() {
        let mut config = gateway_config();
        config.rate_limit.max_requests = 2;
        let engine = DispatchEngine::new(
            Arc::new(InMemoryDirectory::new(directory())),
            Arc::new(RecordingSender::new()),
            Arc::new(InMemoryHistoryStore::new()),
        );
        let router = gateway(config, engine);
        let cookie = verified_cookie();

        for expected_remaining in ["1", "0"] {
            let res = router
                .clone()
                .oneshot(get_from("/api/admin/metrics", "203.0.113.7", &cookie))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
            assert_eq!(res.headers()["x-ratelimit-remaining"], expected_remaining);
        }

        let limited = router
            .clone()
            .oneshot(get_from("/api/admin/metrics", "203.0.113.7", &cookie))
            .await
            .unwrap();
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(limited.headers()["x-ratelimit-limit"], "2");
        assert!(limited.headers().contains_key(header::RETRY_AFTER));

        let other = router
            .oneshot(get_from("/api/admin/metrics", "198.51.100.20", &cookie))
            .await
            .unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rate_limit_counts_unauthenticated_requests() {
        let mut config = gateway_config();
        config.rate_limit.max_requests = 1;
        let engine = DispatchEngine::new(
            Arc::new(InMemoryDirectory::new(directory())),
            Arc::new(RecordingSender::new()),
            Arc::new(InMemoryHistoryStore::new()),
        );
        let router = gateway(config, engine);

        let redirected = router
            .clone()
            .oneshot(get_from("/api/admin/metrics", "192.0.2.1", ""))
            .await
            .unwrap();
        assert_eq!(redirected.status(), StatusCode::TEMPORARY_REDIRECT);

        let limited = router
            .oneshot(get_from("/api/admin/metrics", "192.0.2.1", &verified_cookie()))
            .await
            .unwrap();
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(limited.headers().contains_key("content-security-policy"));
    }
}
