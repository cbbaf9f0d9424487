//! # Domain Services
//!
//! Ports to collaborators outside the relay.
//!
//! ## Services
//!
//! - **MessagePublisher**: write-only hand-off to durable storage

mod publisher;

pub use publisher::*;
