//! HD-02 Admin Gateway - HTTP surface for the broadcast dispatch subsystem.
//!
//! Serves the admin console's dispatch endpoints behind per-client rate
//! limiting and a session/MFA access gate.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      ADMIN GATEWAY (hd-02)                        │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌───────────────────────────────────────────────────────────┐   │
//! │  │                    Middleware Stack                        │   │
//! │  │  SecurityHeaders → Tracing → RateLimit → AccessGate        │   │
//! │  └─────────────────────────────┬─────────────────────────────┘   │
//! │                                │                                  │
//! │  ┌─────────────────────────────┴─────────────────────────────┐   │
//! │  │  /health   /api/admin/broadcast   /api/admin/messages      │   │
//! │  │            /api/admin/metrics                              │   │
//! │  └─────────────────────────────┬─────────────────────────────┘   │
//! └────────────────────────────────┼─────────────────────────────────┘
//!                                  │ BroadcastApi
//!                                  ▼
//!                     hd-01-broadcast-dispatch
//! ```
//!
//! # Access Control
//!
//! - **Rate limit**: fixed window per client IP on `/api/` paths, 429 with `Retry-After`
//! - **Access gate**: signed session cookie plus MFA flag on `/admin` and `/api/admin`,
//!   307 redirects to the login flow otherwise
//! - **Security headers**: CSP, frame denial, nosniff on every response
//!
//! # Usage
//!
//! ```ignore
//! use hd_02_admin_gateway::{AdminGatewayService, GatewayConfig};
//!
//! let service = AdminGatewayService::new(config, Arc::new(engine))?;
//! service.start(shutdown_signal()).await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod domain;
pub mod middleware;
pub mod service;
pub mod session;

// Re-exports for public API
pub use domain::config::GatewayConfig;
pub use domain::error::{ApiError, ApiResult, GatewayError};
pub use domain::types::*;
pub use middleware::{GatewayMetrics, MetricsSnapshot};
pub use service::AdminGatewayService;
pub use session::{SessionCodec, SessionError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
