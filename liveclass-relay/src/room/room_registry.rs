use dashmap::DashMap;
use liveclass_core::{PeerId, RoomId};
use tracing::info;

/// Room membership. A room exists while it has at least one member.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<RoomId, Vec<PeerId>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `peer` and returns the members that were already there.
    pub fn join(&self, room: &RoomId, peer: PeerId) -> Vec<PeerId> {
        let mut members = self.rooms.entry(room.clone()).or_default();
        let existing: Vec<PeerId> = members.iter().copied().filter(|p| *p != peer).collect();
        if !members.contains(&peer) {
            members.push(peer);
        }
        if existing.is_empty() {
            info!("Room '{}' opened", room);
        }
        existing
    }

    /// Removes `peer` and returns the members left behind. Drops the room
    /// once it is empty.
    pub fn leave(&self, room: &RoomId, peer: PeerId) -> Vec<PeerId> {
        let remaining = match self.rooms.get_mut(room) {
            Some(mut members) => {
                members.retain(|p| *p != peer);
                members.clone()
            }
            None => return Vec::new(),
        };
        if remaining.is_empty() && self.rooms.remove_if(room, |_, m| m.is_empty()).is_some() {
            info!("Room '{}' closed", room);
        }
        remaining
    }

    pub fn members(&self, room: &RoomId) -> Vec<PeerId> {
        self.rooms.get(room).map(|m| m.clone()).unwrap_or_default()
    }

    pub fn is_member(&self, room: &RoomId, peer: PeerId) -> bool {
        self.rooms.get(room).is_some_and(|m| m.contains(&peer))
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
