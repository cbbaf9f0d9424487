//! Application Services
//!
//! The relay core that sits between connections and collaborators.
//!
//! ## Available Services
//!
//! - **ConnectionRegistry**: who is online, and how to reach them
//! - **MessageRouter**: drains the inbound queue and fans out deliveries
//! - **PersistenceRelay**: fire-and-forget hand-off to durable storage

pub mod connection_registry;
pub mod message_router;
pub mod persistence_relay;

pub use connection_registry::{ConnectionHandle, ConnectionRegistry, MailboxError, Outbound};
pub use message_router::{Delivery, MessageRouter, RouteOutcome};
pub use persistence_relay::PersistenceRelay;
