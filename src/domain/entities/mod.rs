//! # Domain Entities
//!
//! - **ChatMessage**: a routed direct message, server-stamped at ingestion
//! - **InboundMessage**: the client-controlled subset of an inbound frame

mod message;

pub use message::{ChatMessage, InboundMessage};
