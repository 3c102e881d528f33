//! Ports layer for the session core.
//!
//! Defines the hexagonal architecture port traits:
//! - Inbound (Driving) ports: API exposed to the UI layer
//! - Outbound (Driven) ports: HTTP transport, persistent storage, navigation

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
