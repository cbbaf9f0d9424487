//! WebSocket Chat Endpoint
//!
//! Real-time chat connections: identity at upgrade, per-connection
//! lifecycle, read loop, writer task and keepalive.

pub mod handler;
pub mod identity;
pub mod session;

pub use handler::ws_handler;
pub use identity::{resolve_identity, ConnectParams};
pub use session::{ConnectionSession, ConnectionState};
