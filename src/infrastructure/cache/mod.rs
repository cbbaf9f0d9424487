//! Cache Module
//!
//! Redis connection management and the Redis-backed persistence publisher.
//!
//! # Architecture
//!
//! ```text
//! +--------------------+
//! |  PersistenceRelay  |
//! +--------------------+
//!          |
//!          v
//! +--------------------+
//! |  MessagePublisher  |  <-- Domain port
//! +--------------------+
//!          |
//!          v
//! +--------------------+
//! |   RedisPublisher   |  <-- RPUSH / PUBLISH
//! +--------------------+
//!          |
//!          v
//! +--------------------+
//! | ConnectionManager  |  <-- Reconnecting Redis connection
//! +--------------------+
//! ```

mod persist_publisher;

pub use persist_publisher::RedisPublisher;

use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{info, instrument};

use crate::config::{PersistenceSettings, RedisSettings};

/// Creates a Redis connection manager with automatic reconnection.
///
/// The connection manager handles reconnection when the connection is lost,
/// so a Redis outage degrades persistence without taking the relay down.
#[instrument(skip(settings), fields(url = %settings.url))]
pub async fn create_redis_client(
    settings: &RedisSettings,
) -> Result<ConnectionManager, redis::RedisError> {
    info!("Connecting to Redis...");
    let client = Client::open(settings.url.as_str())?;
    let manager = ConnectionManager::new(client).await?;
    info!("Redis connection established");
    Ok(manager)
}

/// Creates a `RedisPublisher` from configuration settings.
#[instrument(skip_all, fields(url = %redis.url, key = %persistence.key))]
pub async fn create_redis_publisher(
    redis: &RedisSettings,
    persistence: &PersistenceSettings,
) -> Result<RedisPublisher, redis::RedisError> {
    let conn = create_redis_client(redis).await?;
    Ok(RedisPublisher::new(conn, persistence))
}
