//! WebSocket Connection Lifecycle

use std::time::Instant;

use uuid::Uuid;

/// Lifecycle of one connection. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConnectionState {
    Connecting,
    Registered,
    Streaming,
    Closing,
    Closed,
}

/// Per-connection bookkeeping owned by the handler.
#[derive(Debug)]
pub struct ConnectionSession {
    pub user_id: String,
    pub connection_id: Uuid,
    pub frames_in: u64,
    pub opened_at: Instant,
    state: ConnectionState,
}

impl ConnectionSession {
    pub fn new(user_id: String, connection_id: Uuid) -> Self {
        Self {
            user_id,
            connection_id,
            frames_in: 0,
            opened_at: Instant::now(),
            state: ConnectionState::Connecting,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Advance to `next`. Backward or repeated transitions are ignored.
    pub fn transition(&mut self, next: ConnectionState) -> bool {
        if next <= self.state {
            return false;
        }
        tracing::debug!(
            user_id = %self.user_id,
            connection_id = %self.connection_id,
            from = ?self.state,
            to = ?next,
            "Connection state change"
        );
        self.state = next;
        true
    }

    pub fn record_inbound(&mut self) -> u64 {
        self.frames_in += 1;
        self.frames_in
    }
}
