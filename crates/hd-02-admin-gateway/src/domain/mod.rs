//! Domain types for the admin gateway.
//!
//! Configuration, error mapping and HTTP bodies. No I/O lives here.

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    AccessConfig, ConfigError, GatewayConfig, HttpConfig, LimitsConfig, RateLimitConfig,
};
pub use error::{codes, ApiError, ApiResult, GatewayError};
pub use types::*;
