use axum::extract::ws::Message;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use liveclass_core::{PeerId, RelayEvent, RoomId};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::room::RoomRegistry;

struct SignalingInner {
    peers: DashMap<PeerId, mpsc::UnboundedSender<Message>>,
    rooms: RoomRegistry,
}

/// Shared relay state: the outbound queue of every connected peer and the
/// room table.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
}

impl Default for SignalingService {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalingService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                peers: DashMap::new(),
                rooms: RoomRegistry::new(),
            }),
        }
    }

    /// Registers the outbound queue of `peer_id`. Fails if the id is taken.
    pub fn add_peer(&self, peer_id: PeerId, tx: mpsc::UnboundedSender<Message>) -> bool {
        match self.inner.peers.entry(peer_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(tx);
                true
            }
        }
    }

    pub fn remove_peer(&self, peer_id: &PeerId) {
        self.inner.peers.remove(peer_id);
    }

    pub fn join_room(&self, room: &RoomId, peer_id: PeerId) {
        let existing = self.inner.rooms.join(room, peer_id);
        info!("Peer {} joined room '{}' ({} already there)", peer_id, room, existing.len());

        self.send_event(
            peer_id,
            &RelayEvent::Joined {
                room_id: room.clone(),
                peer_id,
            },
        );
        for member in existing {
            self.send_event(member, &RelayEvent::PeerJoined { peer_id });
        }
    }

    pub fn leave_room(&self, room: &RoomId, peer_id: PeerId) {
        let remaining = self.inner.rooms.leave(room, peer_id);
        info!("Peer {} left room '{}'", peer_id, room);
        for member in remaining {
            self.send_event(member, &RelayEvent::PeerLeft { peer_id });
        }
    }

    pub fn is_member(&self, room: &RoomId, peer_id: PeerId) -> bool {
        self.inner.rooms.is_member(room, peer_id)
    }

    /// Delivers `payload` to every member of `room` except the sender. The
    /// payload is not inspected.
    pub fn forward_signal(&self, room: &RoomId, from: PeerId, payload: Value) {
        let event = RelayEvent::Signal {
            from: Some(from),
            payload,
        };
        let targets: Vec<PeerId> = self
            .inner
            .rooms
            .members(room)
            .into_iter()
            .filter(|member| *member != from)
            .collect();

        debug!("Forwarding signal from {} to {} peer(s)", from, targets.len());
        for member in targets {
            self.send_event(member, &event);
        }
    }

    pub fn send_event(&self, peer_id: PeerId, event: &RelayEvent) {
        let Some(peer) = self.inner.peers.get(&peer_id) else {
            warn!("Attempted to send to disconnected peer {}", peer_id);
            return;
        };
        match serde_json::to_string(event) {
            Ok(json) => {
                if let Err(e) = peer.send(Message::Text(json.into())) {
                    error!("Failed to queue WS message for {}: {:?}", peer_id, e);
                }
            }
            Err(e) => error!("Failed to serialize relay event: {}", e),
        }
    }

    pub fn room_count(&self) -> usize {
        self.inner.rooms.room_count()
    }

    pub fn room_members(&self, room: &RoomId) -> Vec<PeerId> {
        self.inner.rooms.members(room)
    }

    pub fn peer_count(&self) -> usize {
        self.inner.peers.len()
    }
}
