//! Admin access gate.
//!
//! Protected paths need a signed session cookie and, depending on the
//! session's MFA state, an MFA-verified flag cookie.
//!
//! | # | Condition | Result |
//! |---|-----------|--------|
//! | 1 | No session cookie | Redirect `/login` |
//! | 2 | Session cookie fails verification or parsing | Redirect `/login`, clear both cookies |
//! | 3 | MFA enrolled or `mfa_required`, flag not `"true"` | Redirect to MFA verify |
//! | 4 | `new`, flag not `"true"` | Redirect to MFA setup |
//! | 5 | Otherwise | Continue |
//!
//! Security headers are set on every branch.

use crate::domain::config::AccessConfig;
use crate::middleware::metrics::GatewayMetrics;
use crate::middleware::security_headers::apply_security_headers;
use crate::session::SessionCodec;
use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    response::Response,
};
use std::sync::Arc;
use tower::{Layer, Service};
use tracing::{debug, info, warn};

pub const LOGIN_PATH: &str = "/login";
pub const MFA_VERIFY_PATH: &str = "/login?flow=verify&mfa_required=true";
pub const MFA_SETUP_PATH: &str = "/login?flow=setup&mfa_required=true";

/// Gate verdict for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Continue,
    Redirect {
        location: &'static str,
        clear_cookies: bool,
        reason: &'static str,
    },
}

impl GateDecision {
    fn redirect(location: &'static str, reason: &'static str) -> Self {
        Self::Redirect {
            location,
            clear_cookies: false,
            reason,
        }
    }
}

/// Session and MFA policy for protected paths.
#[derive(Debug, Clone)]
pub struct AccessGate {
    config: AccessConfig,
    codec: SessionCodec,
}

impl AccessGate {
    pub fn new(config: AccessConfig) -> Self {
        let codec = SessionCodec::new(config.session_secret.as_bytes());
        Self { config, codec }
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    /// Decide for a path given the raw cookie values.
    pub fn authorize(
        &self,
        path: &str,
        credential: Option<&str>,
        mfa_verified: Option<&str>,
    ) -> GateDecision {
        if !self.config.is_protected(path) {
            return GateDecision::Continue;
        }

        let Some(credential) = credential else {
            return GateDecision::redirect(LOGIN_PATH, "missing_session");
        };

        let session = match self.codec.decode(credential) {
            Ok(session) => session,
            Err(e) => {
                warn!(path, error = %e, "Corrupt admin session cookie");
                return GateDecision::Redirect {
                    location: LOGIN_PATH,
                    clear_cookies: true,
                    reason: "corrupt_session",
                };
            }
        };

        let mfa_verified = mfa_verified == Some("true");

        if session.requires_mfa_verification() && !mfa_verified {
            return GateDecision::redirect(MFA_VERIFY_PATH, "mfa_verification_required");
        }
        if session.requires_mfa_setup() && !mfa_verified {
            return GateDecision::redirect(MFA_SETUP_PATH, "mfa_setup_required");
        }

        debug!(path, principal = %session.principal_id, "Admin access granted");
        GateDecision::Continue
    }

    /// Decide for a request, reading the configured cookies.
    pub fn authorize_request<B>(&self, req: &Request<B>) -> GateDecision {
        let headers = req.headers();
        self.authorize(
            req.uri().path(),
            cookie_value(headers, &self.config.session_cookie),
            cookie_value(headers, &self.config.mfa_cookie),
        )
    }

    fn redirect_response(&self, location: &'static str, clear_cookies: bool) -> Response {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::TEMPORARY_REDIRECT;

        let headers = response.headers_mut();
        headers.insert(header::LOCATION, HeaderValue::from_static(location));
        if clear_cookies {
            for name in [&self.config.session_cookie, &self.config.mfa_cookie] {
                if let Ok(value) = HeaderValue::from_str(&clearing_cookie(name)) {
                    headers.append(header::SET_COOKIE, value);
                }
            }
        }
        apply_security_headers(headers);
        response
    }
}

/// `Set-Cookie` value that expires `name` immediately.
pub fn clearing_cookie(name: &str) -> String {
    format!("{name}=; Path=/; Max-Age=0; HttpOnly; Secure; SameSite=Strict")
}

/// First value of cookie `name` across all `Cookie` headers. A present but
/// empty cookie is returned as `Some("")`.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Access gate layer
#[derive(Clone)]
pub struct AccessGateLayer {
    gate: Arc<AccessGate>,
    metrics: Arc<GatewayMetrics>,
}

impl AccessGateLayer {
    pub fn new(config: AccessConfig, metrics: Arc<GatewayMetrics>) -> Self {
        Self {
            gate: Arc::new(AccessGate::new(config)),
            metrics,
        }
    }
}

impl<S> Layer<S> for AccessGateLayer {
    type Service = AccessGateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AccessGateService {
            inner,
            gate: Arc::clone(&self.gate),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

/// Access gate service
#[derive(Clone)]
pub struct AccessGateService<S> {
    inner: S,
    gate: Arc<AccessGate>,
    metrics: Arc<GatewayMetrics>,
}

impl<S> Service<Request<Body>> for AccessGateService<S>
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
        let gate = Arc::clone(&self.gate);
        let metrics = Arc::clone(&self.metrics);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            match gate.authorize_request(&req) {
                GateDecision::Continue => {
                    let mut response = inner.call(req).await?;
                    apply_security_headers(response.headers_mut());
                    Ok(response)
                }
                GateDecision::Redirect {
                    location,
                    clear_cookies,
                    reason,
                } => {
                    info!(
                        path = req.uri().path(),
                        location,
                        reason,
                        "Admin access redirected"
                    );
                    metrics.record_auth_redirect();
                    Ok(gate.redirect_response(location, clear_cookies))
                }
            }
        })
    }
}
