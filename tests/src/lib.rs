//! # Herald Test Suite
//!
//! Cross-crate flows that drive the admin gateway router over a real
//! dispatch engine, file adapters and a recording sender.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── flows.rs    # Dispatch flows end to end
//!     └── access.rs   # Rate limiting and session/MFA gating over HTTP
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p herald-tests
//! cargo test -p herald-tests integration::access
//! ```

pub mod integration;
