//! Common Test Utilities
//!
//! Shared helpers, fixtures, and test infrastructure.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use chat_relay::config::{
    CorsSettings, IdentityMode, JwtSettings, PersistenceMode, PersistenceSettings, RedisSettings,
    RelaySettings, ServerSettings, Settings, SnowflakeSettings, WebSocketSettings,
};
use chat_relay::domain::{ChatMessage, MessagePublisher, PersistEnvelope};
use chat_relay::shared::error::AppError;
use chat_relay::startup::{AppState, Application};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub type WsWrite = SplitSink<WsStream, Message>;
pub type WsRead = SplitStream<WsStream>;

/// How long a test waits for a frame it expects
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// How long a test waits to be sure a frame does not arrive
pub const QUIET_PERIOD: Duration = Duration::from_millis(300);

/// Settings for an in-process relay on an ephemeral port
pub fn test_settings() -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".into(),
            port: 0,
        },
        redis: RedisSettings {
            url: "redis://127.0.0.1:6379".into(),
        },
        jwt: JwtSettings {
            secret: String::new(),
        },
        snowflake: SnowflakeSettings {
            machine_id: 7,
            epoch: 1420070400000,
        },
        cors: CorsSettings {
            allowed_origins: vec![],
        },
        websocket: WebSocketSettings {
            identity: IdentityMode::Query,
            ping_interval_secs: 15,
            outbound_buffer: 64,
            max_message_size: 64 * 1024,
            max_frame_size: 16 * 1024,
        },
        relay: RelaySettings {
            inbound_queue_capacity: 128,
        },
        persistence: PersistenceSettings {
            mode: PersistenceMode::List,
            key: "chat:persist:test".into(),
        },
        environment: "test".into(),
    }
}

/// Publisher that keeps every envelope in memory
#[derive(Default)]
pub struct RecordingPublisher {
    envelopes: Mutex<Vec<PersistEnvelope>>,
    unhealthy: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let publisher = Self::default();
        publisher.unhealthy.store(true, Ordering::SeqCst);
        Arc::new(publisher)
    }

    pub fn envelopes(&self) -> Vec<PersistEnvelope> {
        self.envelopes.lock().clone()
    }

    /// Messages carried by the recorded envelopes
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.envelopes()
            .into_iter()
            .map(|e| serde_json::from_value(e.data).unwrap())
            .collect()
    }

    /// Poll until `count` envelopes were recorded or the timeout passes
    pub async fn wait_for(&self, count: usize) -> Vec<PersistEnvelope> {
        let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
        loop {
            let envelopes = self.envelopes();
            if envelopes.len() >= count || tokio::time::Instant::now() >= deadline {
                return envelopes;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl MessagePublisher for RecordingPublisher {
    async fn publish(&self, envelope: &PersistEnvelope) -> Result<(), AppError> {
        if self.unhealthy.load(Ordering::SeqCst) {
            return Err(AppError::Persistence("recording publisher is down".into()));
        }
        self.envelopes.lock().push(envelope.clone());
        Ok(())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        if self.unhealthy.load(Ordering::SeqCst) {
            return Err(AppError::Persistence("recording publisher is down".into()));
        }
        Ok(())
    }
}

/// A relay running in the background on an ephemeral port
pub struct TestApp {
    pub addr: SocketAddr,
    pub state: AppState,
    pub publisher: Arc<RecordingPublisher>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(test_settings(), RecordingPublisher::new()).await
    }

    pub async fn spawn_with(settings: Settings, publisher: Arc<RecordingPublisher>) -> Self {
        let app = Application::build_with_publisher(settings, publisher.clone())
            .await
            .expect("Failed to build application");
        let addr = app.local_addr().expect("Failed to read local address");
        let state = app.state().clone();
        tokio::spawn(app.run_until_stopped());

        Self {
            addr,
            state,
            publisher,
        }
    }

    pub fn ws_url(&self, user_id: &str) -> String {
        format!("ws://{}/ws/chat?user_id={}", self.addr, user_id)
    }

    /// Connect as `user_id` and wait until the registry lists the connection
    pub async fn connect(&self, user_id: &str) -> (WsWrite, WsRead) {
        let (ws, _) = tokio_tungstenite::connect_async(self.ws_url(user_id))
            .await
            .expect("Failed to connect to WebSocket");
        self.wait_until(|state| state.registry.is_online(user_id))
            .await;
        ws.split()
    }

    /// Poll shared state until `condition` holds or the timeout passes
    pub async fn wait_until(&self, condition: impl Fn(&AppState) -> bool) {
        let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
        while !condition(&self.state) && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// Send a chat frame as JSON text
pub async fn send_chat(write: &mut WsWrite, frame: serde_json::Value) {
    write
        .send(Message::Text(frame.to_string().into()))
        .await
        .expect("Failed to send frame");
}

/// Next chat message, skipping protocol frames
pub async fn recv_chat(read: &mut WsRead) -> ChatMessage {
    loop {
        let frame = tokio::time::timeout(RECV_TIMEOUT, read.next())
            .await
            .expect("Timed out waiting for a chat frame")
            .expect("Stream ended")
            .expect("WebSocket error");
        match frame {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("Unexpected frame: {:?}", other),
        }
    }
}

/// True once a protocol ping arrives, skipping other frames
pub async fn recv_ping(read: &mut WsRead) -> bool {
    loop {
        match tokio::time::timeout(RECV_TIMEOUT, read.next()).await {
            Ok(Some(Ok(Message::Ping(_)))) => return true,
            Ok(Some(Ok(_))) => continue,
            Ok(Some(Err(_))) | Ok(None) | Err(_) => return false,
        }
    }
}

/// Assert that no chat frame arrives within the quiet period
pub async fn assert_no_chat(read: &mut WsRead) {
    if let Ok(Some(Ok(Message::Text(text)))) = tokio::time::timeout(QUIET_PERIOD, read.next()).await
    {
        panic!("Unexpected chat frame: {}", text);
    }
}

/// True once the server closed the connection
pub async fn closed_by_server(read: &mut WsRead) -> bool {
    loop {
        match tokio::time::timeout(RECV_TIMEOUT, read.next()).await {
            Ok(Some(Ok(Message::Close(_)))) | Ok(Some(Err(_))) | Ok(None) => return true,
            Ok(Some(Ok(_))) => continue,
            Err(_) => return false,
        }
    }
}
