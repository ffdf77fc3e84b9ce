//! Adapters layer.
//!
//! Implementations of the outbound ports that need no external service.

pub mod file;
pub mod memory;

pub use file::{JsonFileDirectory, JsonlHistoryStore};
pub use memory::{InMemoryDirectory, InMemoryHistoryStore, RecordingSender, SentMessage};
