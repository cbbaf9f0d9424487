//! Redis Persistence Publisher
//!
//! Hands `persist_chat` envelopes to the storage service through Redis,
//! either as a durable work list or a pub/sub channel.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, instrument};

use crate::config::{PersistenceMode, PersistenceSettings};
use crate::domain::{MessagePublisher, PersistEnvelope};
use crate::shared::error::AppError;

/// `MessagePublisher` backed by a Redis connection manager.
#[derive(Clone)]
pub struct RedisPublisher {
    redis: ConnectionManager,
    mode: PersistenceMode,
    key: String,
}

impl RedisPublisher {
    /// Create a new publisher
    pub fn new(redis: ConnectionManager, settings: &PersistenceSettings) -> Self {
        Self {
            redis,
            mode: settings.mode,
            key: settings.key.clone(),
        }
    }

    pub fn mode(&self) -> PersistenceMode {
        self.mode
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl MessagePublisher for RedisPublisher {
    #[instrument(skip(self, envelope), fields(key = %self.key, name = %envelope.name))]
    async fn publish(&self, envelope: &PersistEnvelope) -> Result<(), AppError> {
        let payload = envelope.to_json()?;
        let mut conn = self.redis.clone();

        match self.mode {
            PersistenceMode::List => {
                let depth: i64 = conn.rpush(&self.key, payload).await?;
                debug!(depth, "Envelope queued");
            }
            PersistenceMode::Channel => {
                let subscribers: i64 = conn.publish(&self.key, payload).await?;
                debug!(subscribers, "Envelope published");
            }
        }

        Ok(())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        let mut conn = self.redis.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(AppError::Persistence(format!("Unexpected PING reply: {}", pong)))
        }
    }
}
