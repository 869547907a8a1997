use liveclass_client::{LocalRelay, Phase, SessionError};

use crate::integration::{Party, init_tracing};

#[tokio::test]
async fn test_call_before_join() {
    init_tracing();

    let relay = LocalRelay::new();
    let party = Party::new(&relay, "a");
    let mut errors = party.session.errors();

    let err = party.session.call().await.unwrap_err();

    assert!(matches!(err, SessionError::InvalidState(_)));
    assert!(matches!(errors.recv().await, Ok(SessionError::InvalidState(_))));
    assert_eq!(party.session.phase(), Phase::Idle);
    assert!(party.peers.peers().is_empty());
}

#[tokio::test]
async fn test_call_while_calling_is_rejected() {
    init_tracing();

    let relay = LocalRelay::new();
    let party = Party::new(&relay, "a");
    party.session.join("class-1").await.unwrap();

    party.session.call().await.unwrap();
    let err = party.session.call().await.unwrap_err();

    assert!(matches!(err, SessionError::InvalidState(_)));
    assert_eq!(party.session.phase(), Phase::Offering);

    party.session.hangup().await;
}
