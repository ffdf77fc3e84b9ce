//! Gateway configuration with validation.
//!
//! Sources, later overriding earlier: built-in defaults, an optional JSON
//! file, then `HERALD_*` environment variables.

use hd_01_broadcast_dispatch::{DispatchConfig, MediaLimits};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

/// Minimum session secret length in bytes.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP server configuration
    pub http: HttpConfig,
    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
    /// Admin access control
    pub access: AccessConfig,
    /// Request size limits
    pub limits: LimitsConfig,
    /// Fan-out tuning
    pub dispatch: DispatchConfig,
    /// Attachment ceilings and encoder settings
    pub media: MediaLimits,
}

impl GatewayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::InvalidRateLimit(
                "max_requests cannot be 0".into(),
            ));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(ConfigError::InvalidRateLimit(
                "window_secs cannot be 0".into(),
            ));
        }

        if self.access.session_secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(ConfigError::WeakSessionSecret {
                len: self.access.session_secret.len(),
                min: MIN_SESSION_SECRET_LEN,
            });
        }

        if self.limits.max_request_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_request_size cannot be 0".into(),
            ));
        }

        if self.dispatch.max_concurrency == 0 {
            return Err(ConfigError::InvalidLimit(
                "dispatch.max_concurrency cannot be 0".into(),
            ));
        }

        if self.media.broadcast_max_bytes == 0 || self.media.message_max_bytes == 0 {
            return Err(ConfigError::InvalidLimit(
                "media ceilings cannot be 0".into(),
            ));
        }
        if !(1..=100).contains(&self.media.jpeg_quality) {
            return Err(ConfigError::InvalidLimit(format!(
                "jpeg_quality must be 1..=100, got {}",
                self.media.jpeg_quality
            )));
        }

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }

    /// Read a JSON configuration file. Missing sections take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))
    }

    /// Apply `HERALD_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HERALD_HOST") {
            self.http.host = parse_var("HERALD_HOST", &host)?;
        }
        if let Some(port) = lookup("HERALD_PORT") {
            self.http.port = parse_var("HERALD_PORT", &port)?;
        }
        if let Some(secret) = lookup("HERALD_SESSION_SECRET") {
            self.access.session_secret = secret;
        }
        if let Some(limit) = lookup("HERALD_RATE_LIMIT") {
            self.rate_limit.max_requests = parse_var("HERALD_RATE_LIMIT", &limit)?;
        }
        if let Some(proxies) = lookup("HERALD_TRUSTED_PROXIES") {
            self.rate_limit.trusted_proxies = proxies
                .split(',')
                .filter(|p| !p.trim().is_empty())
                .map(|p| parse_var("HERALD_TRUSTED_PROXIES", p))
                .collect::<Result<_, _>>()?;
        }
        if let Some(concurrency) = lookup("HERALD_DISPATCH_CONCURRENCY") {
            self.dispatch.max_concurrency =
                parse_var("HERALD_DISPATCH_CONCURRENCY", &concurrency)?;
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{key}: cannot parse {value:?}")))
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 8080)
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 8080,
        }
    }
}

/// Fixed-window rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    pub enabled: bool,
    /// Window length in seconds
    pub window_secs: u64,
    /// Requests allowed per identity per window
    pub max_requests: u32,
    /// Map size that triggers eviction of expired windows
    pub max_tracked_clients: usize,
    /// Only paths under these prefixes are limited
    pub path_prefixes: Vec<String>,
    /// IPs never limited
    pub whitelist: Vec<IpAddr>,
    /// Socket peers whose `X-Forwarded-For`/`X-Real-IP` headers are believed.
    /// Empty means the socket address is always the identity.
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: 60,
            max_requests: 100,
            max_tracked_clients: 10_000,
            path_prefixes: vec!["/api/".to_string()],
            whitelist: Vec::new(),
            trusted_proxies: Vec::new(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn applies_to(&self, path: &str) -> bool {
        self.path_prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }

    pub fn is_trusted_proxy(&self, ip: IpAddr) -> bool {
        self.trusted_proxies.contains(&ip)
    }
}

/// Admin access control configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Paths requiring a verified admin session
    pub protected_prefixes: Vec<String>,
    /// Cookie carrying the signed session
    pub session_cookie: String,
    /// Cookie carrying the MFA-verified flag
    pub mfa_cookie: String,
    /// HMAC key for session signatures
    pub session_secret: String,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            protected_prefixes: vec!["/admin".to_string(), "/api/admin".to_string()],
            session_cookie: "admin_session".to_string(),
            mfa_cookie: "admin_mfa_verified".to_string(),
            session_secret: String::new(),
        }
    }
}

impl std::fmt::Debug for AccessConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessConfig")
            .field("protected_prefixes", &self.protected_prefixes)
            .field("session_cookie", &self.session_cookie)
            .field("mfa_cookie", &self.mfa_cookie)
            .field("session_secret", &"<redacted>")
            .finish()
    }
}

impl AccessConfig {
    /// Prefix match on a path segment boundary, so `/administrator` is not `/admin`.
    pub fn is_protected(&self, path: &str) -> bool {
        self.protected_prefixes.iter().any(|prefix| {
            path.strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }
}

/// Request size limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body in bytes
    pub max_request_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            // Base64 inflates by 4/3; fits a 25MB image plus JSON.
            max_request_size: 40 * 1024 * 1024,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Invalid rate limiting configuration
    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Session secret missing or too short
    #[error("session secret is {len} bytes, need at least {min}")]
    WeakSessionSecret { len: usize, min: usize },
    /// Configuration file unreadable
    #[error("cannot read config: {0}")]
    Io(String),
    /// Configuration file malformed
    #[error("cannot parse config: {0}")]
    Parse(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
