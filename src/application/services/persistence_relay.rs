//! Persistence Relay
//!
//! Fire-and-forget hand-off of every routed message to durable storage.
//! The router calls [`PersistenceRelay::dispatch`] and moves on; the publish
//! runs in its own task, is attempted once, and a failure is logged and
//! dropped. Nothing flows back to the router or to any client.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::domain::{ChatMessage, MessagePublisher, PersistEnvelope};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

/// Best-effort publisher front for the router.
#[derive(Clone)]
pub struct PersistenceRelay {
    publisher: Arc<dyn MessagePublisher>,
}

impl PersistenceRelay {
    pub fn new(publisher: Arc<dyn MessagePublisher>) -> Self {
        Self { publisher }
    }

    /// Start publishing `message` without waiting for the outcome.
    ///
    /// The envelope is built before spawning so the task owns no borrow of
    /// the message. Returns `None` when the message could not be encoded.
    pub fn dispatch(&self, message: &ChatMessage) -> Option<JoinHandle<()>> {
        let envelope = match PersistEnvelope::persist_chat(message) {
            Ok(envelope) => envelope,
            Err(e) => {
                metrics::record_persist("failed");
                error!(
                    message_id = %message.message_id,
                    error = %e,
                    "Failed to encode persistence envelope"
                );
                return None;
            }
        };

        let publisher = self.publisher.clone();
        let message_id = message.message_id.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = publish_once(publisher.as_ref(), &envelope).await {
                error!(
                    message_id = %message_id,
                    error = %e,
                    "Persistence publish failed, message dropped from storage"
                );
            }
        }))
    }

    /// Probe the storage collaborator.
    pub async fn health_check(&self) -> Result<(), AppError> {
        self.publisher.health_check().await
    }
}

async fn publish_once(
    publisher: &dyn MessagePublisher,
    envelope: &PersistEnvelope,
) -> Result<(), AppError> {
    match publisher.publish(envelope).await {
        Ok(()) => {
            metrics::record_persist("published");
            debug!(name = %envelope.name, "Persistence envelope published");
            Ok(())
        }
        Err(e) => {
            metrics::record_persist("failed");
            Err(e)
        }
    }
}
