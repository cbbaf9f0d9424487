//! Chat message entity.
//!
//! A message lives only between ingestion and routing: it is decoded from a
//! client frame, stamped by the server, routed, handed to persistence and
//! dropped. Nothing here retains messages in memory.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;
use crate::shared::snowflake::IdGenerator;

/// A routed chat message, identical on the wire in both directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub content: String,
    pub sender: String,
    pub receiver: String,
    /// Id of the message this one answers, empty when not a reply
    pub reply_to: String,
    /// Unix milliseconds, assigned by the server at ingestion
    pub sent_at: i64,
    pub content_type: String,
    /// Assigned by the server at ingestion
    pub message_id: String,
}

/// The client-controlled part of an inbound frame.
///
/// `sent_at` and `message_id` are deliberately absent so anything a client
/// puts there is dropped during decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InboundMessage {
    pub content: String,
    pub sender: String,
    pub receiver: String,
    pub reply_to: String,
    pub content_type: String,
}

impl InboundMessage {
    /// Decode a JSON frame payload.
    pub fn decode(payload: &[u8]) -> Result<Self, AppError> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Stamp the server-owned fields and produce a routable message.
    ///
    /// `sender` is the identity the connection was registered under; a
    /// different value claimed by the client is replaced.
    pub fn accept(self, sender: &str, ids: &dyn IdGenerator) -> ChatMessage {
        if !self.sender.is_empty() && self.sender != sender {
            tracing::debug!(
                claimed = %self.sender,
                user_id = %sender,
                "Rewriting spoofed sender"
            );
        }

        ChatMessage {
            content: self.content,
            sender: sender.to_string(),
            receiver: self.receiver,
            reply_to: self.reply_to,
            sent_at: Utc::now().timestamp_millis(),
            content_type: self.content_type,
            message_id: ids.next_id(),
        }
    }
}

impl ChatMessage {
    /// Serialize for a text frame.
    pub fn to_json(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn is_reply(&self) -> bool {
        !self.reply_to.is_empty()
    }
}
