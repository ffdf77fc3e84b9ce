//! # Broadcast Dispatch Subsystem
//!
//! **Subsystem ID:** 1
//! **Status:** Production-Ready
//!
//! ## Purpose
//!
//! Fans one administrator-composed message out to many chat targets:
//! a representative channel in every guild, chosen channels, or direct
//! messages to chosen users. Sends are best-effort; one failing target
//! never stops the rest.
//!
//! ## Dispatch Pipeline
//!
//! ```text
//! validate ─→ compose ─→ directory snapshot ─→ resolve ─→ normalize image
//!                                                              │
//!            history (spawned) ←─ aggregate ←─ bounded fan-out ┘
//! ```
//!
//! | Stage | Failure | Effect |
//! |-------|---------|--------|
//! | Validate / compose | `ValidationError` | Whole dispatch rejected, nothing sent |
//! | Snapshot | `DirectoryError` | Whole dispatch rejected |
//! | Resolve | `ResolutionError::EmptyTargetSet` | Whole dispatch rejected |
//! | Normalize | `MediaError` | Whole dispatch rejected |
//! | Send | `SendError` | Recorded in the outcome list only |
//! | History | `HistoryError` | Logged only |
//!
//! ## Outbound Dependencies
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | `DirectoryProvider` | Guilds, channels, users and send permissions |
//! | `MessageSender` | Per-target send to a channel or a user |
//! | `HistoryStore` | Append-only broadcast history |
//! | `TimeSource` | Result timestamps |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      OUTER LAYER                                │
//! │  adapters/memory.rs - In-memory directory, history, sender      │
//! │  adapters/file.rs   - JSON directory file, JSONL history        │
//! │  service.rs         - DispatchEngine (implements BroadcastApi)  │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MIDDLE LAYER                               │
//! │  ports/inbound.rs  - BroadcastApi trait                         │
//! │  ports/outbound.rs - DirectoryProvider, MessageSender, ...      │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      INNER LAYER                                │
//! │  domain/targets.rs - TargetSpec resolution, de-duplication      │
//! │  domain/media.rs   - Image validation and JPEG normalization    │
//! │  domain/payload.rs - Message text composition                   │
//! │  domain/errors.rs  - Error enums                                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::*;
pub use domain::*;
pub use ports::*;
pub use service::{DispatchConfig, DispatchEngine};
