use crate::integration::{ROOM, eventually, init_tracing};
use crate::utils::{TestClient, TestRelay};

#[tokio::test]
async fn test_room_removed_when_empty() {
    init_tracing();
    let relay = TestRelay::spawn().await;

    let mut a = TestClient::connect(&relay.url()).await;
    let mut b = TestClient::connect(&relay.url()).await;
    a.join(ROOM, None).await;
    b.join(ROOM, None).await;
    assert_eq!(relay.service.room_count(), 1);

    a.close().await;
    assert!(eventually(|| relay.service.room_members(&ROOM.into()).len() == 1).await);
    assert_eq!(relay.service.room_count(), 1);

    b.close().await;
    assert!(eventually(|| relay.service.room_count() == 0).await);
    assert!(eventually(|| relay.service.peer_count() == 0).await);
}

#[tokio::test]
async fn test_rooms_are_isolated() {
    init_tracing();
    let relay = TestRelay::spawn().await;

    let mut a = TestClient::connect(&relay.url()).await;
    let mut b = TestClient::connect(&relay.url()).await;
    a.join(ROOM, None).await;
    b.join("class-2", None).await;

    a.signal(ROOM, serde_json::json!({ "type": "offer", "sdp": "v=0" }))
        .await;

    b.expect_silence().await;
    assert_eq!(relay.service.room_count(), 2);
}
