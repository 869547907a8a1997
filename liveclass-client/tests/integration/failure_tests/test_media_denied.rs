use std::sync::Arc;

use liveclass_client::{LocalRelay, Phase, SessionError, Status, SyntheticDevices, TrackKind};

use crate::integration::{Party, ROOM, init_tracing};

#[tokio::test]
async fn test_media_denied() {
    init_tracing();

    let relay = LocalRelay::new();
    let devices = SyntheticDevices::silent();
    devices.deny(TrackKind::Video);
    let party = Party::with_devices(&relay, "a", devices.clone(), Arc::new(devices.clone()));
    let mut errors = party.session.errors();

    let err = party.session.join(ROOM).await.unwrap_err();

    assert!(matches!(err, SessionError::MediaAccess(_)));
    assert!(matches!(errors.recv().await, Ok(SessionError::MediaAccess(_))));
    assert_eq!(party.session.phase(), Phase::Idle);
    assert_eq!(*party.session.status().borrow(), Status::Idle);
    // Audio was opened before video failed and must not leak.
    assert_eq!(devices.opened(), 1);
    assert_eq!(devices.live_captures(), 0);
    assert!(party.peers.peers().is_empty());
    assert_eq!(relay.room_count(), 0);

    // Granting permission makes the retry succeed.
    devices.allow(TrackKind::Video);
    party.session.join(ROOM).await.unwrap();
    assert_eq!(devices.live_captures(), 2);

    party.session.hangup().await;
    assert_eq!(devices.live_captures(), 0);
}
