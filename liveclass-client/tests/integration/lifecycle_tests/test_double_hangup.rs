use liveclass_client::{LocalRelay, Phase, Status};

use crate::integration::{Party, ROOM, init_tracing};

#[tokio::test]
async fn test_double_hangup() {
    init_tracing();

    let relay = LocalRelay::new();
    let party = Party::new(&relay, "a");
    let mut errors = party.session.errors();

    party.session.join(ROOM).await.unwrap();
    assert_eq!(party.devices.live_captures(), 2);

    party.session.hangup().await;
    party.session.hangup().await;

    assert_eq!(party.session.phase(), Phase::Closed);
    assert_eq!(*party.session.status().borrow(), Status::Closed);
    assert_eq!(party.devices.live_captures(), 0);
    assert_eq!(relay.room_count(), 0);

    let peer = party.peers.last().unwrap();
    let closes = peer
        .ops()
        .iter()
        .filter(|op| **op == crate::utils::PeerOp::Close)
        .count();
    assert_eq!(closes, 1);
    assert!(errors.try_recv().is_err());
}

#[tokio::test]
async fn test_hangup_without_join() {
    init_tracing();

    let relay = LocalRelay::new();
    let party = Party::new(&relay, "a");

    party.session.hangup().await;

    assert_eq!(party.session.phase(), Phase::Idle);
}

#[tokio::test]
async fn test_rejoin_after_hangup() {
    init_tracing();

    let relay = LocalRelay::new();
    let party = Party::new(&relay, "a");

    party.session.join(ROOM).await.unwrap();
    party.session.hangup().await;
    party.session.join(ROOM).await.unwrap();

    assert_eq!(party.session.phase(), Phase::Joined);
    assert_eq!(party.devices.live_captures(), 2);
    assert_eq!(party.peers.peers().len(), 2);
    assert_eq!(relay.room_size(&ROOM.into()), 1);

    party.session.hangup().await;
    assert_eq!(party.devices.live_captures(), 0);
}
