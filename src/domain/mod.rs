//! # Domain Layer
//!
//! Core types of the chat relay, independent of transport and storage.
//!
//! ## Structure
//!
//! - **entities**: the chat message and its inbound decoding
//! - **services**: ports implemented by the infrastructure layer

pub mod entities;
pub mod services;

// Re-export commonly used types
pub use entities::*;
pub use services::*;
