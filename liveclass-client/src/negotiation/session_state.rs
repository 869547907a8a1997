use liveclass_core::{IceCandidate, PeerId, RoomId, SessionDescription};

use crate::negotiation::Phase;

/// The single mutable record of a session. Built fresh on every `join`.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub generation: u64,
    pub local_id: PeerId,
    pub room: RoomId,
    pub phase: Phase,
    pub has_local_media: bool,
    pub remote_description_set: bool,
    /// Remote candidates that arrived before the remote description.
    pub pending_candidates: Vec<IceCandidate>,
    /// ICE username fragment of the remote description being applied.
    pub remote_ufrag: Option<String>,
    /// Offer this side produced for the current attempt.
    pub local_offer: Option<SessionDescription>,
    /// Answer this side produced for the current attempt.
    pub sent_answer: Option<SessionDescription>,
}

impl SessionState {
    pub fn new(generation: u64, local_id: PeerId, room: RoomId) -> Self {
        Self {
            generation,
            local_id,
            room,
            phase: Phase::Idle,
            has_local_media: false,
            remote_description_set: false,
            pending_candidates: Vec::new(),
            remote_ufrag: None,
            local_offer: None,
            sent_answer: None,
        }
    }
}
