//! # Herald Node
//!
//! Wiring for the Herald admin broadcast service.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (defaults, `HERALD_CONFIG` file, environment)
//! 2. Initialize telemetry
//! 3. Build adapters: directory snapshot, history log, sender
//! 4. Build the dispatch engine and the admin gateway (validates config)
//! 5. Serve until Ctrl-C
//!
//! ```text
//! herald-node
//!   ├── JsonFileDirectory / InMemoryDirectory ──┐
//!   ├── DryRunSender (or a platform client) ────┼──→ DispatchEngine ──→ AdminGatewayService
//!   └── JsonlHistoryStore ──────────────────────┘
//! ```

pub mod config;
pub mod runtime;
pub mod sender;

pub use config::{load_config, NodeConfig, StorageConfig};
pub use runtime::build_gateway;
pub use sender::DryRunSender;
