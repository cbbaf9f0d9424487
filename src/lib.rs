//! # Chat Relay Library
//!
//! The real-time chat relay of the API gateway:
//! - WebSocket endpoint with one live connection per user
//! - Direct-message routing with echo to the sender
//! - Fire-and-forget persistence hand-off over Redis
//!
//! ## Architecture
//!
//! ```text
//! client -> websocket::handler -> inbound queue -> MessageRouter
//!                                                   |-> PersistenceRelay -> MessagePublisher
//!                                                   |-> ConnectionRegistry -> outbound mailbox -> writer
//! ```
//!
//! ## Module Structure
//!
//! ```text
//! chat_relay/
//! +-- config/         Configuration management
//! +-- domain/         Chat message entity and the publisher port
//! +-- application/    Registry, router and persistence relay
//! +-- infrastructure/ Redis publisher and Prometheus metrics
//! +-- presentation/   WebSocket endpoint, probes and middleware
//! +-- shared/         Common utilities (errors, snowflake IDs)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core types and ports
pub mod domain;

// Application layer - Relay services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
