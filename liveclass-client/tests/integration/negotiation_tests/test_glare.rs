use liveclass_client::{LocalRelay, Status};

use crate::integration::{Party, ROOM, init_tracing};
use crate::utils::PeerOp;

fn accepted_offers(party: &Party) -> usize {
    party
        .peers
        .last()
        .map(|peer| {
            peer.ops()
                .iter()
                .filter(|op| matches!(op, PeerOp::ApplyRemote(sdp) if sdp.sdp.contains("offer")))
                .count()
        })
        .unwrap_or(0)
}

fn answers(party: &Party) -> usize {
    party
        .peers
        .last()
        .map(|peer| peer.ops().iter().filter(|op| **op == PeerOp::CreateAnswer).count())
        .unwrap_or(0)
}

#[tokio::test]
async fn test_glare() {
    init_tracing();

    let relay = LocalRelay::new();
    let a = Party::new(&relay, "a");
    let b = Party::new(&relay, "b");
    a.session.join(ROOM).await.unwrap();
    b.session.join(ROOM).await.unwrap();

    let (ra, rb) = tokio::join!(a.session.call(), b.session.call());
    ra.unwrap();
    rb.unwrap();

    assert!(a.wait_for_status(Status::Connected).await);
    assert!(b.wait_for_status(Status::Connected).await);

    assert_eq!(accepted_offers(&a) + accepted_offers(&b), 1);
    assert_eq!(answers(&a) + answers(&b), 1);

    a.session.hangup().await;
    b.session.hangup().await;
}

#[tokio::test]
async fn test_glare_repeated_converges() {
    init_tracing();

    for _ in 0..10 {
        let relay = LocalRelay::new();
        let a = Party::new(&relay, "a");
        let b = Party::new(&relay, "b");
        a.session.join(ROOM).await.unwrap();
        b.session.join(ROOM).await.unwrap();

        let (ra, rb) = tokio::join!(b.session.call(), a.session.call());
        ra.unwrap();
        rb.unwrap();

        assert!(a.wait_for_status(Status::Connected).await);
        assert!(b.wait_for_status(Status::Connected).await);
        assert_eq!(accepted_offers(&a) + accepted_offers(&b), 1);

        a.session.hangup().await;
        b.session.hangup().await;
    }
}
