//! Fixed-window rate limiting middleware.
//!
//! One window per client identity. The first request opens a window with
//! count 1; a request after the window has elapsed opens a fresh one. Once
//! the count exceeds the limit every further request in the window is
//! denied with `Retry-After` equal to the window length.
//!
//! Memory is bounded: when the map grows past `max_tracked_clients`, all
//! expired windows are evicted.

use crate::domain::config::RateLimitConfig;
use crate::domain::error::codes;
use crate::middleware::metrics::GatewayMetrics;
use crate::middleware::security_headers::apply_security_headers;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderValue, Request, StatusCode},
    response::Response,
};
use dashmap::{mapref::entry::Entry, DashMap};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::{Layer, Service};
use tracing::{debug, warn};

const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Counter for one identity
#[derive(Debug, Clone, Copy)]
struct RateWindow {
    window_start: Instant,
    count: u32,
}

impl RateWindow {
    fn open(now: Instant) -> Self {
        Self {
            window_start: now,
            count: 1,
        }
    }

    fn is_expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_start) > window
    }
}

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Denied { retry_after_secs: u64, count: u32 },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

/// Rate limiter state shared across requests
pub struct RateLimitState {
    /// Per-identity windows
    windows: DashMap<String, RateWindow>,
    /// Configuration
    config: RateLimitConfig,
}

impl RateLimitState {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Check and count a request for `identity` now.
    pub fn check(&self, identity: &str) -> RateDecision {
        self.check_at(identity, Instant::now())
    }

    /// Check and count a request for `identity` at `now`.
    pub fn check_at(&self, identity: &str, now: Instant) -> RateDecision {
        let limit = self.config.max_requests;
        let window = self.config.window();

        // The entry guard holds a shard lock; release it before eviction.
        let count = match self.windows.entry(identity.to_string()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if entry.is_expired(now, window) {
                    *entry = RateWindow::open(now);
                } else {
                    entry.count = entry.count.saturating_add(1);
                }
                entry.count
            }
            Entry::Vacant(vacant) => {
                debug!(client = identity, "Opening rate limit window");
                vacant.insert(RateWindow::open(now));
                1
            }
        };

        if self.windows.len() > self.config.max_tracked_clients {
            self.evict_expired(now);
        }

        if count > limit {
            RateDecision::Denied {
                retry_after_secs: self.config.window_secs,
                count,
            }
        } else {
            RateDecision::Allowed {
                remaining: limit - count,
            }
        }
    }

    /// Drop every window that started more than one window ago.
    pub fn evict_expired(&self, now: Instant) {
        let window = self.config.window();
        let before = self.windows.len();
        self.windows.retain(|_, w| !w.is_expired(now, window));
        debug!(
            evicted = before.saturating_sub(self.windows.len()),
            remaining = self.windows.len(),
            "Evicted expired rate limit windows"
        );
    }

    /// Get number of tracked identities
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    fn is_whitelisted(&self, ip: IpAddr) -> bool {
        self.config.whitelist.contains(&ip)
    }
}

/// Rate limit layer
#[derive(Clone)]
pub struct RateLimitLayer {
    state: Arc<RateLimitState>,
    metrics: Arc<GatewayMetrics>,
}

impl RateLimitLayer {
    pub fn new(config: RateLimitConfig, metrics: Arc<GatewayMetrics>) -> Self {
        Self {
            state: Arc::new(RateLimitState::new(config)),
            metrics,
        }
    }

    pub fn state(&self) -> Arc<RateLimitState> {
        Arc::clone(&self.state)
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            state: Arc::clone(&self.state),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

/// Rate limit service
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    state: Arc<RateLimitState>,
    metrics: Arc<GatewayMetrics>,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let state = Arc::clone(&self.state);
        let metrics = Arc::clone(&self.metrics);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let config = state.config();
            if !config.enabled || !config.applies_to(req.uri().path()) {
                return inner.call(req).await;
            }

            let ip = extract_client_ip(&req, config);
            if state.is_whitelisted(ip) {
                return inner.call(req).await;
            }

            let limit = config.max_requests;
            match state.check(&ip.to_string()) {
                RateDecision::Allowed { remaining } => {
                    let mut response = inner.call(req).await?;
                    let headers = response.headers_mut();
                    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
                    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
                    Ok(response)
                }
                RateDecision::Denied {
                    retry_after_secs,
                    count,
                } => {
                    warn!(client = %ip, count, limit, "Rate limit exceeded");
                    metrics.record_rate_limit_rejection();
                    Ok(rate_limit_response(limit, retry_after_secs))
                }
            }
        })
    }
}

/// Identity used for rate limiting.
///
/// The socket peer from `ConnectInfo` is the identity unless that peer is a
/// configured trusted proxy, in which case the forwarded headers name the
/// client. Without `ConnectInfo` the peer is taken to be localhost.
pub(crate) fn extract_client_ip<B>(req: &Request<B>, config: &RateLimitConfig) -> IpAddr {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|connect_info| connect_info.0.ip())
        .unwrap_or(IpAddr::from([127, 0, 0, 1]));

    if !config.is_trusted_proxy(peer) {
        return peer;
    }

    // Walk X-Forwarded-For right to left; the first hop that is not one of
    // our proxies is the client. Earlier entries are client-controlled.
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
    {
        let hop = forwarded
            .rsplit(',')
            .filter_map(|hop| hop.trim().parse::<IpAddr>().ok())
            .find(|ip| !config.is_trusted_proxy(*ip));
        if let Some(ip) = hop {
            return ip;
        }
    }

    if let Some(ip) = req
        .headers()
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<IpAddr>().ok())
    {
        return ip;
    }

    peer
}

/// Create rate limit exceeded response
fn rate_limit_response(limit: u32, retry_after_secs: u64) -> Response {
    let body = serde_json::json!({
        "error": codes::RATE_LIMITED,
        "message": format!("Too many requests. Try again in {retry_after_secs} seconds."),
        "retryAfter": retry_after_secs,
    });

    let mut response = Response::new(Body::from(serde_json::to_vec(&body).unwrap_or_default()));
    *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from_static("0"));
    apply_security_headers(headers);

    response
}
