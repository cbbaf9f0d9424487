//! Health Check API Tests
//!
//! Probe endpoints served by the relay router.

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::Value;

use chat_relay::presentation::http::routes;
use chat_relay::startup::AppState;

use crate::common::{test_settings, RecordingPublisher};

fn server_with(publisher: std::sync::Arc<RecordingPublisher>) -> TestServer {
    let (state, _inbound_rx) = AppState::new(test_settings(), publisher);
    TestServer::new(routes::create_router(state)).unwrap()
}

fn server() -> TestServer {
    server_with(RecordingPublisher::new())
}

/// Test load balancer heartbeat
#[tokio::test]
async fn test_ping_returns_dot() {
    let server = server();

    let response = server.get("/ping").await;

    response.assert_status_ok();
    response.assert_text(".");
}

/// Test basic health check endpoint returns JSON with status field
#[tokio::test]
async fn test_health_check_returns_ok() {
    let server = server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
    assert!(json.get("version").is_some());
}

/// Liveness never depends on collaborators
#[tokio::test]
async fn test_liveness_probe() {
    let server = server_with(RecordingPublisher::failing());

    let response = server.get("/health/live").await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["status"], "alive");
}

#[tokio::test]
async fn test_readiness_probe_reports_checks() {
    let server = server();

    let response = server.get("/health/ready").await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_ne!(json["status"], "unhealthy");
    assert_eq!(json["checks"]["websocket"]["active_connections"], 0);
    assert!(json["checks"]["persistence"]["status"].is_string());
}

/// Readiness returns 503 when the storage collaborator is unreachable
#[tokio::test]
async fn test_readiness_unavailable_when_publisher_down() {
    let server = server_with(RecordingPublisher::failing());

    let response = server.get("/health/ready").await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let json: Value = response.json();
    assert_eq!(json["status"], "unhealthy");
    assert!(json["checks"]["persistence"]["message"].is_string());
}

#[tokio::test]
async fn test_metrics_exposed() {
    let server = server();
    server.get("/ping").await;

    let response = server.get("/metrics").await;

    response.assert_status_ok();
    assert!(response.text().contains("http_requests_total"));
}

/// A chat connection without an identity is rejected before upgrade
#[tokio::test]
async fn test_chat_without_user_id_rejected() {
    let server = server();

    let response = server.get("/ws/chat").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let json: Value = response.json();
    assert!(json.get("message").is_some());
}
