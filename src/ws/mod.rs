//! WebSocket transport: wire protocol, session hub and connection handler

pub mod handler;
pub mod hub;
pub mod protocol;

pub use hub::SessionHub;
