//! Presentation Layer
//!
//! The chat WebSocket endpoint, HTTP probes and the tower middleware
//! wrapped around them.

pub mod http;
pub mod middleware;
pub mod websocket;
