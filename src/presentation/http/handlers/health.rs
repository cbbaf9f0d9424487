//! Probe Handlers
//!
//! - `GET /ping` - load balancer heartbeat, body `.`
//! - `GET /health` - process is up, with version
//! - `GET /health/live` - liveness, never touches collaborators
//! - `GET /health/ready` - readiness, probes the persistence publisher

use std::time::Instant;

use axum::{extract::State, http::StatusCode, Json};
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::startup::AppState;

static STARTED: Lazy<Instant> = Lazy::new(Instant::now);

/// A reachable publisher slower than this reports `degraded`
const DEGRADED_AFTER_MS: u64 = 50;

/// Pin the uptime origin to process start rather than the first probe
pub fn init_server_start() {
    Lazy::force(&STARTED);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    fn http_status(self) -> StatusCode {
        match self {
            Self::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
            Self::Healthy | Self::Degraded => StatusCode::OK,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<&'static str>,
}

/// Body of `/health/ready`
#[derive(Debug, Serialize)]
pub struct ReadinessReport {
    pub status: HealthStatus,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub checks: ReadinessChecks,
}

#[derive(Debug, Serialize)]
pub struct ReadinessChecks {
    pub persistence: PublisherCheck,
    pub websocket: ConnectionsCheck,
}

#[derive(Debug, Serialize)]
pub struct PublisherCheck {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConnectionsCheck {
    pub active_connections: usize,
}

pub async fn ping() -> &'static str {
    "."
}

pub async fn health_check() -> Json<ProbeResponse> {
    Json(ProbeResponse {
        status: "healthy",
        version: Some(env!("CARGO_PKG_VERSION")),
    })
}

pub async fn liveness() -> Json<ProbeResponse> {
    Json(ProbeResponse {
        status: "alive",
        version: None,
    })
}

/// Ready when the persistence publisher answers. Live routing does not
/// depend on it, but messages accepted while it is down are never stored.
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadinessReport>) {
    let persistence = probe_publisher(&state).await;
    let status = persistence.status;

    let report = ReadinessReport {
        status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: STARTED.elapsed().as_secs(),
        checks: ReadinessChecks {
            persistence,
            websocket: ConnectionsCheck {
                active_connections: state.registry.len(),
            },
        },
    };

    (status.http_status(), Json(report))
}

async fn probe_publisher(state: &AppState) -> PublisherCheck {
    let began = Instant::now();
    match state.persistence.health_check().await {
        Ok(()) => {
            let elapsed_ms = began.elapsed().as_millis() as u64;
            PublisherCheck {
                status: classify_latency(elapsed_ms),
                latency_ms: Some(elapsed_ms),
                message: None,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Persistence publisher unreachable");
            PublisherCheck {
                status: HealthStatus::Unhealthy,
                latency_ms: None,
                message: Some(e.to_string()),
            }
        }
    }
}

fn classify_latency(latency_ms: u64) -> HealthStatus {
    if latency_ms < DEGRADED_AFTER_MS {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    }
}
