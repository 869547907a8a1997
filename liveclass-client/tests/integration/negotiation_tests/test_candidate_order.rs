use std::sync::Arc;
use std::time::Duration;

use liveclass_client::relay::ChannelEvent;
use liveclass_client::{LocalRelay, RelayTransport, Status};
use liveclass_core::{IceCandidate, PeerId, RelayEvent, RoomId, SessionDescription, SignalMessage};
use parking_lot::Mutex;

use crate::integration::{Party, ROOM, WAIT, init_tracing};
use crate::utils::PeerOp;

fn ice(label: &str) -> SignalMessage {
    SignalMessage::IceCandidate {
        candidate: IceCandidate::new(format!("candidate:{label}")),
    }
}

#[tokio::test]
async fn test_candidate_order() {
    init_tracing();

    let relay = LocalRelay::new();
    let room = RoomId::from(ROOM);
    let b = Party::new(&relay, "b");
    b.session.join(ROOM).await.unwrap();

    // The remote side is driven by hand through a raw relay channel.
    let remote = relay.connect("").await.unwrap();
    let inbox = Arc::new(Mutex::new(Vec::new()));
    let sink = inbox.clone();
    remote.on_message(Box::new(move |event| sink.lock().push(event)));
    remote.join_room(&room, PeerId::new()).await.unwrap();

    for n in 0..5 {
        remote.send(&room, &ice(&format!("early-{n}"))).await.unwrap();
    }
    remote
        .send(
            &room,
            &SignalMessage::Offer {
                sdp: SessionDescription::offer("v=0 remote"),
            },
        )
        .await
        .unwrap();

    assert!(b.wait_for_status(Status::Connected).await);

    let peer = b.peers.last().unwrap();
    let ops = peer.ops();
    let applied_at = ops
        .iter()
        .position(|op| matches!(op, PeerOp::ApplyRemote(_)))
        .unwrap();
    let first_candidate_at = ops
        .iter()
        .position(|op| matches!(op, PeerOp::AddCandidate(_)))
        .unwrap();
    assert!(applied_at < first_candidate_at);

    let expected: Vec<_> = (0..5)
        .map(|n| IceCandidate::new(format!("candidate:early-{n}")))
        .collect();
    assert_eq!(peer.applied_candidates(), expected);

    // Candidates after the description go straight through.
    remote.send(&room, &ice("late-0")).await.unwrap();
    remote.send(&room, &ice("late-1")).await.unwrap();

    let deadline = std::time::Instant::now() + WAIT;
    while peer.applied_candidates().len() < 7 && std::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let applied = peer.applied_candidates();
    assert_eq!(applied.len(), 7);
    assert_eq!(applied[6], IceCandidate::new("candidate:late-1"));

    let answered = inbox.lock().iter().any(|event| match event {
        ChannelEvent::Relay(RelayEvent::Signal { payload, .. }) => {
            matches!(
                SignalMessage::from_payload(payload),
                Ok(SignalMessage::Answer { .. })
            )
        }
        _ => false,
    });
    assert!(answered);

    b.session.hangup().await;
    remote.close().await;
}
