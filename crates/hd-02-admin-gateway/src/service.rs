//! Admin gateway service: router, handlers and server lifecycle.

use crate::domain::config::GatewayConfig;
use crate::domain::error::{codes, ApiError, ApiResult, GatewayError};
use crate::domain::types::{BroadcastBody, DispatchResponse, HealthResponse, MessageBody};
use crate::middleware::{GatewayMetrics, MiddlewareStack, RateLimitState};
use crate::VERSION;
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use hd_01_broadcast_dispatch::{BroadcastApi, DispatchError};
use shared_types::BroadcastResult;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tracing::{info, warn};

/// Admin gateway service state
pub struct AdminGatewayService {
    config: GatewayConfig,
    api: Arc<dyn BroadcastApi>,
    middleware: MiddlewareStack,
}

impl AdminGatewayService {
    /// Create a new admin gateway over a dispatch backend.
    pub fn new(config: GatewayConfig, api: Arc<dyn BroadcastApi>) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        let middleware = MiddlewareStack::from_config(&config);

        Ok(Self {
            config,
            api,
            middleware,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Get metrics
    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        self.middleware.metrics()
    }

    /// Get rate limit state
    pub fn rate_limit_state(&self) -> Arc<RateLimitState> {
        self.middleware.rate_limit_state()
    }

    /// Build the HTTP router with the full middleware stack.
    pub fn router(&self) -> Router {
        let state = AppState {
            api: Arc::clone(&self.api),
            metrics: self.middleware.metrics(),
        };

        let middleware = ServiceBuilder::new()
            .layer(self.middleware.security_headers.clone())
            .layer(self.middleware.tracing.clone())
            .layer(self.middleware.rate_limit.clone())
            .layer(self.middleware.access_gate.clone());

        Router::new()
            .route("/health", get(health_check))
            .route("/api/admin/broadcast", post(handle_broadcast))
            .route("/api/admin/messages", post(handle_message))
            .route("/api/admin/metrics", get(handle_metrics))
            .layer(DefaultBodyLimit::max(self.config.limits.max_request_size))
            .layer(middleware)
            .with_state(state)
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn start<F>(&self, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.http_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Bind(format!("{addr}: {e}")))?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener
            .local_addr()
            .map_err(|e| GatewayError::Bind(e.to_string()))?;
        info!(addr = %addr, "Starting admin gateway");

        let eviction = self.start_eviction_task();
        let router = self.router();

        let result = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| GatewayError::Internal(e.to_string()));

        eviction.abort();
        info!("Admin gateway stopped");
        result
    }

    /// Periodically drop expired rate-limit windows.
    fn start_eviction_task(&self) -> tokio::task::JoinHandle<()> {
        let state = self.middleware.rate_limit_state();
        let period = self.config.rate_limit.window();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                state.evict_expired(Instant::now());
            }
        })
    }
}

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    api: Arc<dyn BroadcastApi>,
    metrics: Arc<GatewayMetrics>,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: VERSION,
    })
}

async fn handle_metrics(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(state.metrics.to_json())
}

async fn handle_broadcast(
    State(state): State<AppState>,
    body: Result<Json<BroadcastBody>, JsonRejection>,
) -> ApiResult<Json<DispatchResponse>> {
    let Json(body) = body.map_err(|rejection| reject_body(&state, rejection))?;
    let request = body.into_request().map_err(|e| {
        state.metrics.record_dispatch_rejected();
        ApiError::from(e)
    })?;

    let result = state.api.dispatch(request).await;
    respond(&state, result)
}

async fn handle_message(
    State(state): State<AppState>,
    body: Result<Json<MessageBody>, JsonRejection>,
) -> ApiResult<Json<DispatchResponse>> {
    let Json(body) = body.map_err(|rejection| reject_body(&state, rejection))?;
    let message = body.into_message().map_err(|e| {
        state.metrics.record_dispatch_rejected();
        ApiError::from(e)
    })?;

    let result = state.api.send_message(message).await;
    respond(&state, result)
}

fn reject_body(state: &AppState, rejection: JsonRejection) -> ApiError {
    state.metrics.record_dispatch_rejected();
    ApiError::new(rejection.status(), codes::INVALID_REQUEST, rejection.body_text())
}

fn respond(
    state: &AppState,
    result: Result<BroadcastResult, DispatchError>,
) -> ApiResult<Json<DispatchResponse>> {
    match result {
        Ok(result) => {
            state
                .metrics
                .record_dispatch(result.sent_count, result.failed_count);
            Ok(Json(DispatchResponse::from(&result)))
        }
        Err(e) => {
            warn!(error = %e, "Dispatch rejected");
            state.metrics.record_dispatch_rejected();
            Err(e.into())
        }
    }
}
