//! Ports layer for the broadcast dispatch subsystem.
//!
//! - Inbound (Driving) ports: API exposed to the admin gateway
//! - Outbound (Driven) ports: directory, chat platform, history store, clock

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
