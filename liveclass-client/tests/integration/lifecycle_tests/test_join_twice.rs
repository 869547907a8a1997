use liveclass_client::{LocalRelay, Phase, SessionError};

use crate::integration::{Party, ROOM, init_tracing};

#[tokio::test]
async fn test_join_twice() {
    init_tracing();

    let relay = LocalRelay::new();
    let party = Party::new(&relay, "a");

    party.session.join(ROOM).await.unwrap();
    let err = party.session.join("class-2").await.unwrap_err();

    assert!(matches!(err, SessionError::InvalidState(_)));
    assert_eq!(party.session.phase(), Phase::Joined);
    assert_eq!(relay.room_size(&ROOM.into()), 1);
    assert_eq!(relay.room_size(&"class-2".into()), 0);

    party.session.hangup().await;
}
