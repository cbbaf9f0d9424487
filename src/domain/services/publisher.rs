//! Durable-storage publisher port.
//!
//! The relay only ever writes to storage, and only through this trait.
//! The contract is best-effort: one publish attempt per message, no retry,
//! no acknowledgement back to the router or any client. A message can be
//! delivered live and never stored, or stored and never delivered.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::entities::ChatMessage;
use crate::shared::error::AppError;

/// Envelope name the storage service dispatches chat writes on
pub const PERSIST_CHAT: &str = "persist_chat";

/// Named wrapper handed to the storage collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistEnvelope {
    pub name: String,
    pub data: serde_json::Value,
}

impl PersistEnvelope {
    /// Wrap a message as a `persist_chat` envelope.
    pub fn persist_chat(message: &ChatMessage) -> Result<Self, AppError> {
        Ok(Self {
            name: PERSIST_CHAT.to_string(),
            data: serde_json::to_value(message)?,
        })
    }

    pub fn to_json(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Write-only port to the durable-storage collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Publish one envelope. Called exactly once per message.
    async fn publish(&self, envelope: &PersistEnvelope) -> Result<(), AppError>;

    /// Cheap reachability probe used by the readiness endpoint.
    async fn health_check(&self) -> Result<(), AppError>;
}
