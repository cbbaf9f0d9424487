//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;

use crate::application::services::{ConnectionRegistry, MessageRouter, PersistenceRelay};
use crate::config::{IdentityMode, Settings};
use crate::domain::{ChatMessage, MessagePublisher};
use crate::infrastructure::cache;
use crate::presentation::http::routes;
use crate::presentation::middleware::{cors, logging};
use crate::shared::snowflake::{IdGenerator, SnowflakeGenerator};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConnectionRegistry>,
    /// Producer side of the shared inbound queue
    pub inbound: mpsc::Sender<ChatMessage>,
    pub ids: Arc<dyn IdGenerator>,
    pub persistence: PersistenceRelay,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Build the relay components. The returned receiver is the router's end
    /// of the inbound queue.
    pub fn new(
        settings: Settings,
        publisher: Arc<dyn MessagePublisher>,
    ) -> (Self, mpsc::Receiver<ChatMessage>) {
        let (inbound, inbound_rx) = mpsc::channel(settings.relay.inbound_queue_capacity);

        let ids = Arc::new(SnowflakeGenerator::new(
            settings.snowflake.machine_id as u64,
            settings.snowflake.epoch,
        ));

        let state = Self {
            registry: Arc::new(ConnectionRegistry::new()),
            inbound,
            ids,
            persistence: PersistenceRelay::new(publisher),
            settings: Arc::new(settings),
        };

        (state, inbound_rx)
    }
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
    relay_task: JoinHandle<()>,
    state: AppState,
}

impl Application {
    /// Build the application from settings, publishing to Redis
    pub async fn build(settings: Settings) -> Result<Self> {
        let publisher = cache::create_redis_publisher(&settings.redis, &settings.persistence).await?;
        tracing::info!(
            mode = ?publisher.mode(),
            key = %publisher.key(),
            "Persistence publisher ready"
        );

        Self::build_with_publisher(settings, Arc::new(publisher)).await
    }

    /// Build the application around an existing publisher
    pub async fn build_with_publisher(
        settings: Settings,
        publisher: Arc<dyn MessagePublisher>,
    ) -> Result<Self> {
        if settings.websocket.identity == IdentityMode::Query {
            tracing::warn!(
                "websocket.identity = \"query\": user_id is accepted without verification"
            );
        }

        let addr = settings.server.socket_addr()?;
        let cors_layer = cors::create_cors_layer(&settings.cors);

        let (state, inbound_rx) = AppState::new(settings, publisher);

        // Start the single consumer of the inbound queue
        let relay_task =
            MessageRouter::new(state.registry.clone(), state.persistence.clone()).spawn(inbound_rx);

        // Build router with middleware
        let router = routes::create_router(state.clone()).layer(
            ServiceBuilder::new()
                .layer(logging::create_trace_layer())
                .layer(cors_layer),
        );

        // Bind to address
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            router,
            relay_task,
            state,
        })
    }

    /// Run the server until stopped
    ///
    /// Stops accepting on ctrl-c. Live WebSocket connections are not drained.
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        self.relay_task.abort();
        tracing::info!("Server stopped");
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared state, for inspection in tests
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install ctrl-c handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
