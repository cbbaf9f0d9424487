//! Connection Registry
//!
//! Authoritative map from user identifier to the live connection that can
//! reach it. One entry per user; a new registration replaces the old one
//! without telling the superseded connection.
//!
//! Every operation holds the lock only for the map access itself. Handles
//! are cloned out, so no caller ever writes to a socket under the lock.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::ChatMessage;
use crate::infrastructure::metrics;

/// Frames queued for a connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Chat(ChatMessage),
    Ping,
    Close,
}

/// Why a message could not be queued for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MailboxError {
    #[error("outbound mailbox full")]
    Full,
    #[error("connection closed")]
    Closed,
}

/// Non-owning reference to a live connection: its identity and the sending
/// side of its ordered outbound mailbox.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    user_id: String,
    connection_id: Uuid,
    outbound: mpsc::Sender<Outbound>,
}

impl ConnectionHandle {
    pub fn new(user_id: impl Into<String>, outbound: mpsc::Sender<Outbound>) -> Self {
        Self {
            user_id: user_id.into(),
            connection_id: Uuid::new_v4(),
            outbound,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    /// Queue a message without waiting. Never blocks the caller.
    pub fn try_deliver(&self, message: ChatMessage) -> Result<(), MailboxError> {
        self.outbound
            .try_send(Outbound::Chat(message))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => MailboxError::Full,
                mpsc::error::TrySendError::Closed(_) => MailboxError::Closed,
            })
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

/// Thread-safe user → connection map.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<String, ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for the handle's user.
    ///
    /// Returns the superseded handle, if any.
    pub fn register(&self, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        let user_id = handle.user_id.clone();
        let connection_id = handle.connection_id;

        let (previous, count) = {
            let mut connections = self.connections.lock();
            let previous = connections.insert(user_id.clone(), handle);
            (previous, connections.len())
        };
        metrics::set_websocket_connections(count);

        match &previous {
            Some(old) => tracing::info!(
                user_id = %user_id,
                connection_id = %connection_id,
                superseded = %old.connection_id,
                "Connection registered, replacing previous connection"
            ),
            None => tracing::info!(
                user_id = %user_id,
                connection_id = %connection_id,
                "Connection registered"
            ),
        }

        previous
    }

    /// Current connection for a user, if online.
    pub fn lookup(&self, user_id: &str) -> Option<ConnectionHandle> {
        self.connections.lock().get(user_id).cloned()
    }

    /// Remove the entry for a user. No-op when absent.
    pub fn unregister(&self, user_id: &str) -> Option<ConnectionHandle> {
        let (removed, count) = {
            let mut connections = self.connections.lock();
            let removed = connections.remove(user_id);
            (removed, connections.len())
        };

        if let Some(handle) = &removed {
            metrics::set_websocket_connections(count);
            tracing::info!(
                user_id = %user_id,
                connection_id = %handle.connection_id,
                "Connection unregistered"
            );
        }

        removed
    }

    /// Remove the entry for a user only if it still belongs to `connection_id`.
    ///
    /// A connection that was superseded by a reconnect must not evict its
    /// replacement when it finally tears down.
    pub fn unregister_connection(&self, user_id: &str, connection_id: Uuid) -> bool {
        let (removed, count) = {
            let mut connections = self.connections.lock();
            let owned = connections
                .get(user_id)
                .is_some_and(|h| h.connection_id == connection_id);
            if owned {
                connections.remove(user_id);
            }
            (owned, connections.len())
        };

        if removed {
            metrics::set_websocket_connections(count);
            tracing::info!(
                user_id = %user_id,
                connection_id = %connection_id,
                "Connection unregistered"
            );
        } else {
            tracing::debug!(
                user_id = %user_id,
                connection_id = %connection_id,
                "Connection already superseded, registry entry kept"
            );
        }

        removed
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.connections.lock().contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }
}
