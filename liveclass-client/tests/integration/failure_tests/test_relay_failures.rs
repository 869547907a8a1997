use std::time::Duration;

use liveclass_client::{LocalRelay, Phase, SessionError, Status};

use crate::integration::{Party, ROOM, init_tracing};

#[tokio::test]
async fn test_relay_unreachable() {
    init_tracing();

    let relay = LocalRelay::new();
    relay.set_offline(true);
    let party = Party::new(&relay, "a");

    let err = party.session.join(ROOM).await.unwrap_err();

    assert!(matches!(err, SessionError::Connection(_)));
    assert_eq!(party.session.phase(), Phase::Closed);
    assert_eq!(party.devices.live_captures(), 0);
    assert!(party.peers.last().unwrap().is_closed());
}

#[tokio::test]
async fn test_relay_drop_is_terminal() {
    init_tracing();

    let relay = LocalRelay::new();
    let party = Party::new(&relay, "a");
    let mut errors = party.session.errors();
    party.session.join(ROOM).await.unwrap();

    relay.drop_all();

    let err = tokio::time::timeout(Duration::from_secs(2), errors.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(err, SessionError::Connection(_)));
    assert!(party.wait_for_status(Status::Closed).await);
    assert_eq!(party.devices.live_captures(), 0);

    // No retry: the session stays closed until joined again.
    relay.set_offline(false);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(party.session.phase(), Phase::Closed);

    party.session.hangup().await;
}
