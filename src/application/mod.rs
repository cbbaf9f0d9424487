//! Application Layer
//!
//! Routing and persistence services. This layer connects the WebSocket
//! presentation layer to the domain ports without knowing about sockets.

pub mod services;
