//! Middleware stack for the admin gateway.
//!
//! Layer order: Request → SecurityHeaders → Tracing → RateLimit → AccessGate → Handler
//!
//! Security headers sit outermost so rate-limit rejections and access
//! redirects carry them as well as handler responses.

pub mod access_gate;
pub mod metrics;
pub mod rate_limit;
pub mod security_headers;
pub mod tracing;

pub use access_gate::{
    clearing_cookie, cookie_value, AccessGate, AccessGateLayer, GateDecision, LOGIN_PATH,
    MFA_SETUP_PATH, MFA_VERIFY_PATH,
};
pub use metrics::{GatewayMetrics, MetricsSnapshot, RequestTimer};
pub use rate_limit::{RateDecision, RateLimitLayer, RateLimitState};
pub use security_headers::{apply_security_headers, SecurityHeadersLayer};
pub use tracing::TracingLayer;

use crate::domain::config::GatewayConfig;
use std::sync::Arc;

/// Middleware stack builder
pub struct MiddlewareStack {
    pub security_headers: SecurityHeadersLayer,
    pub tracing: TracingLayer,
    pub rate_limit: RateLimitLayer,
    pub access_gate: AccessGateLayer,
    pub metrics: Arc<GatewayMetrics>,
}

impl MiddlewareStack {
    /// Create middleware stack from gateway config
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::with_metrics(config, Arc::new(GatewayMetrics::new()))
    }

    /// Same as [`from_config`](Self::from_config), sharing existing counters
    pub fn with_metrics(config: &GatewayConfig, metrics: Arc<GatewayMetrics>) -> Self {
        Self {
            security_headers: SecurityHeadersLayer::new(),
            tracing: TracingLayer::new(Arc::clone(&metrics)),
            rate_limit: RateLimitLayer::new(config.rate_limit.clone(), Arc::clone(&metrics)),
            access_gate: AccessGateLayer::new(config.access.clone(), Arc::clone(&metrics)),
            metrics,
        }
    }

    /// Get shared metrics
    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Get rate limit state for the eviction task
    pub fn rate_limit_state(&self) -> Arc<RateLimitState> {
        self.rate_limit.state()
    }
}
