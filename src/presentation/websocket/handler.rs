//! WebSocket Connection Handler
//!
//! Owns one client connection end to end:
//!
//! ```text
//! Connecting -> Registered -> Streaming -> Closing -> Closed
//! ```
//!
//! The socket is split. The read half stays in the handler loop, which
//! decodes frames and pushes them onto the shared inbound queue. The write
//! half belongs to a writer task draining the connection's outbound mailbox
//! (chat frames from the router, pings from the keepalive task). The loop
//! ends on a read error, a malformed frame, a close from the client, or the
//! writer failing; teardown then unregisters and closes.

use std::fmt::Display;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};

use super::identity::{resolve_identity, ConnectParams};
use super::session::{ConnectionSession, ConnectionState};
use crate::application::services::{ConnectionHandle, Outbound};
use crate::domain::InboundMessage;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// How long teardown waits for the writer to flush a close frame
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// WebSocket upgrade handler
///
/// Identity is resolved before the upgrade is accepted, so a rejected
/// request never creates any connection state.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<ConnectParams>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, AppError> {
    let bearer = bearer.as_ref().map(|TypedHeader(Authorization(b))| b.token());
    let user_id = resolve_identity(&state.settings, &params, bearer)?;

    let ws = ws.map_err(|e| {
        tracing::debug!(user_id = %user_id, error = %e, "Upgrade rejected");
        AppError::BadRequest(format!("WebSocket upgrade failed: {}", e))
    })?;

    let limits = &state.settings.websocket;
    Ok(ws
        .max_message_size(limits.max_message_size)
        .max_frame_size(limits.max_frame_size)
        .on_failed_upgrade(|e| tracing::warn!(error = %e, "WebSocket upgrade failed"))
        .on_upgrade(move |socket| handle_socket(socket, user_id, state)))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, user_id: String, state: AppState) {
    let (sink, stream) = socket.split();
    run_connection(sink, stream, user_id, state).await;
}

/// Register, stream and tear down one connection over its split halves.
async fn run_connection<W, R, E>(sink: W, mut stream: R, user_id: String, state: AppState)
where
    W: Sink<Message> + Unpin + Send + 'static,
    W::Error: Display,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let (tx, rx) = mpsc::channel::<Outbound>(state.settings.websocket.outbound_buffer);

    let handle = ConnectionHandle::new(user_id.clone(), tx.clone());
    let mut session = ConnectionSession::new(user_id.clone(), handle.connection_id());
    state.registry.register(handle);
    session.transition(ConnectionState::Registered);

    let mut writer = tokio::spawn(write_outbound(sink, rx));
    let writer_abort = writer.abort_handle();
    let keepalive = tokio::spawn(keepalive(
        tx.clone(),
        Duration::from_secs(state.settings.websocket.ping_interval_secs),
    ));
    session.transition(ConnectionState::Streaming);

    tracing::info!(
        user_id = %session.user_id,
        connection_id = %session.connection_id,
        "User connected"
    );

    let mut writer_done = false;
    loop {
        tokio::select! {
            frame = stream.next() => {
                let result = match frame {
                    Some(Ok(Message::Text(text))) => ingest(text.as_str().as_bytes(), &mut session, &state).await,
                    Some(Ok(Message::Binary(bytes))) => ingest(&bytes, &mut session, &state).await,
                    Some(Ok(Message::Close(frame))) => {
                        tracing::debug!(user_id = %session.user_id, reason = ?frame, "Client initiated close");
                        break;
                    }
                    // Pong is handled automatically by axum
                    Some(Ok(_)) => Ok(()),
                    Some(Err(e)) => {
                        tracing::debug!(user_id = %session.user_id, error = %e, "WebSocket read error");
                        break;
                    }
                    None => {
                        tracing::debug!(user_id = %session.user_id, "WebSocket stream ended");
                        break;
                    }
                };

                if let Err(e) = result {
                    tracing::debug!(
                        user_id = %session.user_id,
                        connection_id = %session.connection_id,
                        error = %e,
                        "Closing connection"
                    );
                    break;
                }
            }

            result = &mut writer => {
                writer_done = true;
                match result {
                    Ok(Err(e)) => tracing::warn!(
                        user_id = %session.user_id,
                        connection_id = %session.connection_id,
                        error = %e,
                        "Outbound write failed, closing connection"
                    ),
                    Ok(Ok(())) => tracing::debug!(user_id = %session.user_id, "Outbound writer finished"),
                    Err(e) => tracing::error!(user_id = %session.user_id, error = %e, "Outbound writer panicked"),
                }
                break;
            }
        }
    }

    session.transition(ConnectionState::Closing);
    keepalive.abort();
    state
        .registry
        .unregister_connection(&session.user_id, session.connection_id);

    if !writer_done {
        if let Err(mpsc::error::TrySendError::Full(_)) = tx.try_send(Outbound::Close) {
            tracing::debug!(
                user_id = %session.user_id,
                connection_id = %session.connection_id,
                "Outbound mailbox full, closing without a close frame"
            );
        }
        drop(tx);
        if timeout(CLOSE_GRACE, writer).await.is_err() {
            writer_abort.abort();
        }
    }
    session.transition(ConnectionState::Closed);

    tracing::info!(
        user_id = %session.user_id,
        connection_id = %session.connection_id,
        frames_in = session.frames_in,
        duration_ms = session.opened_at.elapsed().as_millis() as u64,
        "User disconnected"
    );
}

/// Decode one inbound frame, stamp it and enqueue it for routing.
///
/// Blocks while the shared inbound queue is full.
async fn ingest(
    payload: &[u8],
    session: &mut ConnectionSession,
    state: &AppState,
) -> Result<(), AppError> {
    let message = InboundMessage::decode(payload)?.accept(&session.user_id, state.ids.as_ref());
    let seq = session.record_inbound();

    tracing::debug!(
        user_id = %session.user_id,
        message_id = %message.message_id,
        receiver = %message.receiver,
        seq,
        "Message accepted"
    );

    state
        .inbound
        .send(message)
        .await
        .map_err(|_| AppError::Internal("Inbound queue closed".into()))
}

/// Drain the outbound mailbox into the socket, in order.
async fn write_outbound<W>(mut sink: W, mut rx: mpsc::Receiver<Outbound>) -> Result<(), AppError>
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    while let Some(frame) = rx.recv().await {
        let message = match frame {
            Outbound::Chat(chat) => match chat.to_json() {
                Ok(text) => Message::Text(text.into()),
                Err(e) => {
                    tracing::error!(message_id = %chat.message_id, error = %e, "Failed to serialize message");
                    continue;
                }
            },
            Outbound::Ping => Message::Ping(Bytes::new()),
            Outbound::Close => {
                let _ = sink.send(Message::Close(None)).await;
                return Ok(());
            }
        };

        sink.send(message)
            .await
            .map_err(|e| AppError::Delivery(e.to_string()))?;
    }
    Ok(())
}

/// Queue a protocol ping every `period`. Ends quietly once the mailbox is gone.
///
/// This task never closes the connection itself. A ping the writer fails to
/// put on the socket ends the connection like any other failed write.
async fn keepalive(outbound: mpsc::Sender<Outbound>, period: Duration) {
    let mut ticker = interval(period);
    ticker.tick().await; // Skip first immediate tick

    loop {
        ticker.tick().await;
        if outbound.send(Outbound::Ping).await.is_err() {
            tracing::trace!("Keepalive stopped, connection writer gone");
            return;
        }
    }
}
