use liveclass_core::{ClientEvent, RelayEvent, RoomId};

use crate::integration::{ROOM, init_tracing};
use crate::utils::{TestClient, TestRelay};

#[tokio::test]
async fn test_members_hear_joins_and_leaves() {
    init_tracing();
    let relay = TestRelay::spawn().await;

    let mut instructor = TestClient::connect(&relay.url()).await;
    instructor.join(ROOM, None).await;

    let mut student = TestClient::connect(&relay.url()).await;
    let student_id = student.join(ROOM, None).await;

    match instructor.recv().await {
        Some(RelayEvent::PeerJoined { peer_id }) => assert_eq!(peer_id, student_id),
        other => panic!("Expected peer-joined, got {:?}", other),
    }
    // The newcomer is not told about itself.
    student.expect_silence().await;

    student
        .send_event(&ClientEvent::Leave {
            room_id: RoomId::from(ROOM),
        })
        .await;

    match instructor.recv().await {
        Some(RelayEvent::PeerLeft { peer_id }) => assert_eq!(peer_id, student_id),
        other => panic!("Expected peer-left, got {:?}", other),
    }
}

#[tokio::test]
async fn test_disconnect_counts_as_leave() {
    init_tracing();
    let relay = TestRelay::spawn().await;

    let mut instructor = TestClient::connect(&relay.url()).await;
    instructor.join(ROOM, None).await;
    let mut student = TestClient::connect(&relay.url()).await;
    let student_id = student.join(ROOM, None).await;
    assert!(matches!(instructor.recv().await, Some(RelayEvent::PeerJoined { .. })));

    student.close().await;

    match instructor.recv().await {
        Some(RelayEvent::PeerLeft { peer_id }) => assert_eq!(peer_id, student_id),
        other => panic!("Expected peer-left, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rejoin_moves_between_rooms() {
    init_tracing();
    let relay = TestRelay::spawn().await;

    let mut watcher = TestClient::connect(&relay.url()).await;
    watcher.join(ROOM, None).await;

    let mut mover = TestClient::connect(&relay.url()).await;
    let mover_id = mover.join(ROOM, None).await;
    assert!(matches!(watcher.recv().await, Some(RelayEvent::PeerJoined { .. })));

    let acked = mover.join("class-2", None).await;
    assert_eq!(acked, mover_id);

    match watcher.recv().await {
        Some(RelayEvent::PeerLeft { peer_id }) => assert_eq!(peer_id, mover_id),
        other => panic!("Expected peer-left, got {:?}", other),
    }
    assert_eq!(relay.service.room_members(&RoomId::from("class-2")), vec![mover_id]);
}
