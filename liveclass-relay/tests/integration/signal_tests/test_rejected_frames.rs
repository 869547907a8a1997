use liveclass_core::RelayEvent;
use serde_json::json;

use crate::integration::{ROOM, init_tracing};
use crate::utils::{TestClient, TestRelay};

#[tokio::test]
async fn test_malformed_frame_keeps_socket_open() {
    init_tracing();
    let relay = TestRelay::spawn().await;
    let mut client = TestClient::connect(&relay.url()).await;

    client.send_text("{not json").await;
    assert!(matches!(client.recv().await, Some(RelayEvent::Error { .. })));

    client.send_text(r#"{"event":"teleport"}"#).await;
    assert!(matches!(client.recv().await, Some(RelayEvent::Error { .. })));

    // Still usable afterwards.
    client.join(ROOM, None).await;
}

#[tokio::test]
async fn test_signal_before_join_is_rejected() {
    init_tracing();
    let relay = TestRelay::spawn().await;
    let mut client = TestClient::connect(&relay.url()).await;

    client.signal(ROOM, json!({ "type": "answer", "sdp": "v=0" })).await;

    assert!(matches!(client.recv().await, Some(RelayEvent::Error { .. })));
}

#[tokio::test]
async fn test_signal_to_foreign_room_is_rejected() {
    init_tracing();
    let relay = TestRelay::spawn().await;

    let mut insider = TestClient::connect(&relay.url()).await;
    let mut outsider = TestClient::connect(&relay.url()).await;
    insider.join(ROOM, None).await;
    outsider.join("class-2", None).await;

    outsider
        .signal(ROOM, json!({ "type": "answer", "sdp": "v=0" }))
        .await;

    match outsider.recv().await {
        Some(RelayEvent::Error { message }) => assert!(message.contains(ROOM)),
        other => panic!("Expected error, got {:?}", other),
    }
    insider.expect_silence().await;
}
