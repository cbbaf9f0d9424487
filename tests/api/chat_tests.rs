//! Chat Relay Tests
//!
//! End-to-end routing over real WebSocket connections.

use futures::SinkExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;

use chat_relay::domain::PERSIST_CHAT;

use crate::common::{
    assert_no_chat, closed_by_server, recv_chat, recv_ping, send_chat, test_settings,
    RecordingPublisher, TestApp,
};

#[tokio::test]
async fn test_message_delivered_and_echoed() {
    let app = TestApp::spawn().await;
    let (mut alice_tx, mut alice_rx) = app.connect("alice").await;
    let (_bob_tx, mut bob_rx) = app.connect("bob").await;

    send_chat(
        &mut alice_tx,
        json!({"content": "hi", "receiver": "bob", "content_type": "text"}),
    )
    .await;

    let delivered = recv_chat(&mut bob_rx).await;
    let echoed = recv_chat(&mut alice_rx).await;

    assert_eq!(delivered, echoed);
    assert_eq!(delivered.content, "hi");
    assert_eq!(delivered.sender, "alice");
    assert_eq!(delivered.receiver, "bob");
    assert!(!delivered.message_id.is_empty());
    assert!(delivered.sent_at > 0);

    let envelopes = app.publisher.wait_for(1).await;
    assert_eq!(envelopes.len(), 1);
    assert_eq!(envelopes[0].name, PERSIST_CHAT);
    assert_eq!(app.publisher.messages()[0], delivered);
}

#[tokio::test]
async fn test_offline_receiver_still_persisted() {
    let app = TestApp::spawn().await;
    let (mut carol_tx, mut carol_rx) = app.connect("carol").await;

    send_chat(&mut carol_tx, json!({"content": "later", "receiver": "dave"})).await;

    let echoed = recv_chat(&mut carol_rx).await;
    assert_eq!(echoed.receiver, "dave");

    let envelopes = app.publisher.wait_for(1).await;
    assert_eq!(envelopes.len(), 1);
    assert_eq!(app.publisher.messages()[0].message_id, echoed.message_id);
}

#[tokio::test]
async fn test_disconnected_receiver_gets_nothing() {
    let app = TestApp::spawn().await;
    let (mut alice_tx, mut alice_rx) = app.connect("alice").await;
    let (mut bob_tx, _bob_rx) = app.connect("bob").await;

    bob_tx.send(Message::Close(None)).await.unwrap();
    app.wait_until(|state| !state.registry.is_online("bob")).await;
    assert!(!app.state.registry.is_online("bob"));

    send_chat(&mut alice_tx, json!({"content": "gone?", "receiver": "bob"})).await;

    recv_chat(&mut alice_rx).await;
    assert_eq!(app.publisher.wait_for(1).await.len(), 1);
}

#[tokio::test]
async fn test_self_message_delivered_and_echoed() {
    let app = TestApp::spawn().await;
    let (mut alice_tx, mut alice_rx) = app.connect("alice").await;

    send_chat(&mut alice_tx, json!({"content": "note", "receiver": "alice"})).await;

    let delivered = recv_chat(&mut alice_rx).await;
    let echoed = recv_chat(&mut alice_rx).await;
    assert_eq!(delivered.content, "note");
    assert_eq!(delivered, echoed);
    assert_no_chat(&mut alice_rx).await;
    assert_eq!(app.publisher.wait_for(1).await.len(), 1);
}

#[tokio::test]
async fn test_keepalive_pings_every_interval() {
    let mut settings = test_settings();
    settings.websocket.ping_interval_secs = 1;
    let app = TestApp::spawn_with(settings, RecordingPublisher::new()).await;
    let (_alice_tx, mut alice_rx) = app.connect("alice").await;

    for _ in 0..2 {
        assert!(recv_ping(&mut alice_rx).await);
    }
    assert!(app.state.registry.is_online("alice"));
}

#[tokio::test]
async fn test_malformed_frame_closes_only_that_connection() {
    let app = TestApp::spawn().await;
    let (mut alice_tx, mut alice_rx) = app.connect("alice").await;
    let (mut bob_tx, _bob_rx) = app.connect("bob").await;
    let (_carol_tx, mut carol_rx) = app.connect("carol").await;

    alice_tx
        .send(Message::Text("not json".into()))
        .await
        .unwrap();

    assert!(closed_by_server(&mut alice_rx).await);
    app.wait_until(|state| !state.registry.is_online("alice")).await;
    assert!(!app.state.registry.is_online("alice"));

    send_chat(&mut bob_tx, json!({"content": "still here", "receiver": "carol"})).await;
    assert_eq!(recv_chat(&mut carol_rx).await.content, "still here");
}

#[tokio::test]
async fn test_client_cannot_choose_server_fields() {
    let app = TestApp::spawn().await;
    let (mut alice_tx, mut alice_rx) = app.connect("alice").await;

    send_chat(
        &mut alice_tx,
        json!({
            "content": "spoof",
            "sender": "mallory",
            "receiver": "bob",
            "sent_at": 42,
            "message_id": "client-chosen",
        }),
    )
    .await;

    let echoed = recv_chat(&mut alice_rx).await;
    assert_eq!(echoed.sender, "alice");
    assert_ne!(echoed.message_id, "client-chosen");
    assert_ne!(echoed.sent_at, 42);
}

#[tokio::test]
async fn test_reconnect_replaces_connection() {
    let app = TestApp::spawn().await;
    let (_old_tx, mut old_rx) = app.connect("alice").await;
    let first = app.state.registry.lookup("alice").unwrap().connection_id();

    let (_new_tx, mut new_rx) = app.connect("alice").await;
    app.wait_until(|state| {
        state
            .registry
            .lookup("alice")
            .is_some_and(|h| h.connection_id() != first)
    })
    .await;

    let (mut bob_tx, _bob_rx) = app.connect("bob").await;
    send_chat(&mut bob_tx, json!({"content": "which one?", "receiver": "alice"})).await;

    assert_eq!(recv_chat(&mut new_rx).await.content, "which one?");
    assert_no_chat(&mut old_rx).await;
    assert_eq!(app.state.registry.len(), 2);
}

#[tokio::test]
async fn test_messages_arrive_in_send_order() {
    let app = TestApp::spawn().await;
    let (mut alice_tx, _alice_rx) = app.connect("alice").await;
    let (_bob_tx, mut bob_rx) = app.connect("bob").await;

    for i in 0..20 {
        send_chat(&mut alice_tx, json!({"content": i.to_string(), "receiver": "bob"})).await;
    }

    for i in 0..20 {
        assert_eq!(recv_chat(&mut bob_rx).await.content, i.to_string());
    }
}
