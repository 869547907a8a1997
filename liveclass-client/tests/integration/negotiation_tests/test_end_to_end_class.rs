use std::time::Duration;

use liveclass_client::{LocalRelay, Phase, Status};
use liveclass_core::IceCandidate;

use crate::integration::{Party, ROOM, WAIT, init_tracing, wait_until};
use crate::utils::PeerOp;

#[tokio::test]
async fn test_end_to_end_class() {
    init_tracing();

    let relay = LocalRelay::new();
    let a = Party::new(&relay, "a");
    let b = Party::new(&relay, "b");

    a.session.join(ROOM).await.unwrap();
    b.session.join(ROOM).await.unwrap();
    assert_eq!(relay.room_size(&ROOM.into()), 2);
    assert_eq!(a.session.phase(), Phase::Joined);

    a.session.call().await.unwrap();

    assert!(a.wait_for_status(Status::Connected).await);
    assert!(b.wait_for_status(Status::Connected).await);
    assert!(wait_until(a.session.remote_stream(), |s| s.is_some()).await);
    assert!(wait_until(b.session.remote_stream(), |s| s.is_some()).await);

    let a_peer = a.peers.last().unwrap();
    let b_peer = b.peers.last().unwrap();
    assert!(b_peer.ops().iter().any(|op| matches!(
        op,
        PeerOp::ApplyRemote(sdp) if sdp.sdp == "v=0 offer-a0"
    )));
    assert!(b_peer.ops().contains(&PeerOp::CreateAnswer));
    assert!(!a_peer.ops().contains(&PeerOp::CreateAnswer));

    // Each side ends up with the other's trickled candidate.
    let deadline = std::time::Instant::now() + WAIT;
    while a_peer.applied_candidates().is_empty() && std::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(a_peer.applied_candidates(), vec![IceCandidate::new("candidate:b0-0")]);
    assert_eq!(b_peer.applied_candidates(), vec![IceCandidate::new("candidate:a0-0")]);

    a.session.hangup().await;
    b.session.hangup().await;

    assert_eq!(a.devices.live_captures(), 0);
    assert_eq!(b.devices.live_captures(), 0);
    assert!(a_peer.is_closed() && b_peer.is_closed());
    assert!(a.session.remote_stream().borrow().is_none());
    assert_eq!(a.session.phase(), Phase::Closed);
    assert_eq!(relay.room_count(), 0);
}
