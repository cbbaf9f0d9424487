//! # Chat Relay
//!
//! Real-time chat relay entry point.
//!
//! Initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Redis persistence publisher
//! - Message router and HTTP/WebSocket server

use anyhow::Result;
use tracing::info;

use chat_relay::config::Settings;
use chat_relay::presentation::http::handlers::health;
use chat_relay::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for structured logging
    chat_relay::telemetry::init_tracing();
    health::init_server_start();

    info!("Starting Chat Relay...");

    // Load configuration from environment and config files
    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        identity = ?settings.websocket.identity,
        machine_id = settings.snowflake.machine_id,
        "Configuration loaded"
    );

    // Build and run the application
    let application = Application::build(settings).await?;

    info!("Relay ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
