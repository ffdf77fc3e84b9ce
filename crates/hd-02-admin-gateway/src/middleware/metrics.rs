//! Gateway counters.
//!
//! Exposed as JSON on `/api/admin/metrics` behind the access gate.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Admin gateway metrics
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    // Request counters
    pub requests_total: AtomicU64,
    pub requests_success: AtomicU64,
    pub requests_error: AtomicU64,

    // Middleware rejections
    pub rate_limit_rejected: AtomicU64,
    pub auth_redirects: AtomicU64,

    // Dispatch counters
    pub dispatches_total: AtomicU64,
    pub dispatches_rejected: AtomicU64,
    pub targets_sent: AtomicU64,
    pub targets_failed: AtomicU64,

    // Latency tracking
    pub total_latency_ms: AtomicU64,
    pub request_count_for_latency: AtomicU64,
}

/// Point-in-time copy of every counter
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub requests_success: u64,
    pub requests_error: u64,
    pub rate_limit_rejected: u64,
    pub auth_redirects: u64,
    pub dispatches_total: u64,
    pub dispatches_rejected: u64,
    pub targets_sent: u64,
    pub targets_failed: u64,
    pub average_latency_ms: f64,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished request
    pub fn record_request(&self, success: bool, latency_ms: u64) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);

        if success {
            self.requests_success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.requests_error.fetch_add(1, Ordering::Relaxed);
        }

        self.total_latency_ms
            .fetch_add(latency_ms, Ordering::Relaxed);
        self.request_count_for_latency
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Record rate limit rejection
    pub fn record_rate_limit_rejection(&self) {
        self.rate_limit_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an access gate redirect
    pub fn record_auth_redirect(&self) {
        self.auth_redirects.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed dispatch with its per-target counts
    pub fn record_dispatch(&self, sent: usize, failed: usize) {
        self.dispatches_total.fetch_add(1, Ordering::Relaxed);
        self.targets_sent.fetch_add(sent as u64, Ordering::Relaxed);
        self.targets_failed
            .fetch_add(failed as u64, Ordering::Relaxed);
    }

    /// Record a dispatch refused before any send
    pub fn record_dispatch_rejected(&self) {
        self.dispatches_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Get average latency in ms
    pub fn average_latency_ms(&self) -> f64 {
        let total = self.total_latency_ms.load(Ordering::Relaxed);
        let count = self.request_count_for_latency.load(Ordering::Relaxed);
        if count == 0 {
            0.0
        } else {
            total as f64 / count as f64
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_success: self.requests_success.load(Ordering::Relaxed),
            requests_error: self.requests_error.load(Ordering::Relaxed),
            rate_limit_rejected: self.rate_limit_rejected.load(Ordering::Relaxed),
            auth_redirects: self.auth_redirects.load(Ordering::Relaxed),
            dispatches_total: self.dispatches_total.load(Ordering::Relaxed),
            dispatches_rejected: self.dispatches_rejected.load(Ordering::Relaxed),
            targets_sent: self.targets_sent.load(Ordering::Relaxed),
            targets_failed: self.targets_failed.load(Ordering::Relaxed),
            average_latency_ms: self.average_latency_ms(),
        }
    }

    /// Export metrics as JSON
    pub fn to_json(&self) -> serde_json::Value {
        let s = self.snapshot();
        serde_json::json!({
            "requests": {
                "total": s.requests_total,
                "success": s.requests_success,
                "error": s.requests_error,
            },
            "access": {
                "rate_limited": s.rate_limit_rejected,
                "redirects": s.auth_redirects,
            },
            "dispatch": {
                "total": s.dispatches_total,
                "rejected": s.dispatches_rejected,
                "targets_sent": s.targets_sent,
                "targets_failed": s.targets_failed,
            },
            "latency": {
                "average_ms": s.average_latency_ms,
            }
        })
    }
}

/// Request timing helper
pub struct RequestTimer {
    start: Instant,
    metrics: Arc<GatewayMetrics>,
}

impl RequestTimer {
    pub fn new(metrics: Arc<GatewayMetrics>) -> Self {
        Self {
            start: Instant::now(),
            metrics,
        }
    }

    pub fn finish(self, success: bool) {
        let latency_ms = self.start.elapsed().as_millis() as u64;
        self.metrics.record_request(success, latency_ms);
    }
}
