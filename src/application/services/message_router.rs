//! Message Router
//!
//! Single consumer of the shared inbound queue. One queue and one consumer
//! means the order messages leave the queue is the global arrival order.
//!
//! For each message the router:
//! 1. dispatches persistence (fire-and-forget),
//! 2. queues it on the receiver's outbound mailbox if the receiver is online,
//! 3. queues an identical echo on the sender's mailbox if the sender is online,
//!    even when the sender is also the receiver.
//!
//! Mailbox sends never wait, so a slow recipient cannot stall routing, and
//! since each connection has exactly one mailbox drained by one writer,
//! messages for the same recipient reach its socket in routing order.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::connection_registry::{ConnectionRegistry, MailboxError};
use super::persistence_relay::PersistenceRelay;
use crate::domain::ChatMessage;
use crate::infrastructure::metrics;

/// What happened to one copy of a routed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued on the target connection's mailbox
    Queued,
    /// Target not registered
    Offline,
    /// Target registered but its mailbox was full or already closed
    Dropped,
}

impl Delivery {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Offline => "offline",
            Self::Dropped => "dropped",
        }
    }
}

/// Result of routing one message, for logging and tests only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteOutcome {
    pub receiver: Delivery,
    pub echo: Delivery,
}

/// Routes inbound messages to live connections.
pub struct MessageRouter {
    registry: Arc<ConnectionRegistry>,
    persistence: PersistenceRelay,
}

impl MessageRouter {
    pub fn new(registry: Arc<ConnectionRegistry>, persistence: PersistenceRelay) -> Self {
        Self {
            registry,
            persistence,
        }
    }

    /// Run the router on its own task.
    pub fn spawn(self, inbound: mpsc::Receiver<ChatMessage>) -> JoinHandle<()> {
        tokio::spawn(self.run(inbound))
    }

    /// Drain the inbound queue until every producer is gone.
    pub async fn run(self, mut inbound: mpsc::Receiver<ChatMessage>) {
        info!("Message router started");
        while let Some(message) = inbound.recv().await {
            self.route(message);
        }
        info!("Inbound queue closed, message router stopped");
    }

    /// Route a single message. Never blocks and never fails.
    pub fn route(&self, message: ChatMessage) -> RouteOutcome {
        metrics::record_routed();
        debug!(
            message_id = %message.message_id,
            sender = %message.sender,
            receiver = %message.receiver,
            "Routing message"
        );

        self.persistence.dispatch(&message);

        // A self-addressed message is delivered and echoed, so it arrives twice.
        let receiver_id = message.receiver.clone();
        let sender_id = message.sender.clone();
        let receiver = self.deliver("receiver", &receiver_id, message.clone());
        let echo = self.deliver("echo", &sender_id, message);

        RouteOutcome { receiver, echo }
    }

    fn deliver(&self, target: &'static str, user_id: &str, message: ChatMessage) -> Delivery {
        let outcome = match self.registry.lookup(user_id) {
            None => Delivery::Offline,
            Some(handle) => match handle.try_deliver(message) {
                Ok(()) => Delivery::Queued,
                Err(MailboxError::Full) => {
                    warn!(
                        user_id = %user_id,
                        connection_id = %handle.connection_id(),
                        target,
                        "Outbound mailbox full, message dropped for this connection"
                    );
                    Delivery::Dropped
                }
                Err(MailboxError::Closed) => {
                    warn!(
                        user_id = %user_id,
                        connection_id = %handle.connection_id(),
                        target,
                        "Connection writer gone, removing stale registration"
                    );
                    self.registry
                        .unregister_connection(user_id, handle.connection_id());
                    Delivery::Dropped
                }
            },
        };

        metrics::record_delivery(target, outcome.as_str());
        outcome
    }
}
