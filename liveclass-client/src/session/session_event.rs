use liveclass_core::RelayEvent;

use crate::error::SessionError;
use crate::negotiation::Input;
use crate::peer::{PeerState, RemoteTrack};

/// Something that happened on behalf of one session generation.
#[derive(Debug)]
pub enum SessionEvent {
    /// Effect completion or relay/peer occurrence the machine consumes directly.
    Input(Input),
    Relay(RelayEvent),
    PeerState(PeerState),
    RemoteTrack(RemoteTrack),
    /// Non-fatal failure to surface as-is.
    Warning(SessionError),
    /// Every resource of the generation has been released.
    Released,
}

/// A [`SessionEvent`] stamped with the generation that produced it.
#[derive(Debug)]
pub struct Stamped {
    pub generation: u64,
    pub event: SessionEvent,
}
