//! # Herald Telemetry
//!
//! Structured logging bootstrap shared by Herald binaries.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use herald_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_telemetry(&TelemetryConfig::from_env())?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `herald` | Service name attached to every event |
//! | `HERALD_LOG_LEVEL` | `RUST_LOG`, then `info` | Filter directives |
//! | `HERALD_JSON_LOGS` | `true` in containers | JSON output |
//! | `HERALD_CONSOLE_OUTPUT` | `true` | Emit to stdout at all |

mod config;
mod subscriber;

pub use config::TelemetryConfig;
pub use subscriber::init_telemetry;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("global subscriber already initialized")]
    AlreadyInitialized,

    #[error("invalid log filter {directives:?}: {reason}")]
    InvalidFilter { directives: String, reason: String },
}
