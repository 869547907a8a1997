use liveclass_core::{IceCandidate, PeerId, SessionDescription, SignalMessage};

use crate::error::SessionError;

/// Everything that can drive the machine: user actions, effect completions,
/// relay and peer events.
#[derive(Debug, Clone)]
pub enum Input {
    Join,
    MediaAcquired,
    MediaFailed(String),
    RelayConnected,
    RelayDropped(String),
    Call,
    LocalOfferCreated(SessionDescription),
    LocalAnswerCreated(SessionDescription),
    RemoteDescriptionApplied,
    NegotiationFailed(String),
    /// Candidate gathered by the local peer connection.
    LocalCandidate(IceCandidate),
    PeerFailed(String),
    Signal {
        from: Option<PeerId>,
        message: SignalMessage,
    },
    Hangup,
}

/// Side effects the façade executes on the machine's behalf, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    AcquireMedia,
    /// Create the peer connection if needed and attach local tracks.
    AttachTracks,
    /// Connect to the relay, subscribe and join the room.
    ConnectRelay,
    CreateOffer,
    CreateAnswer,
    ApplyRemoteDescription(SessionDescription),
    AddIceCandidate(IceCandidate),
    Send(SignalMessage),
    ReleaseResources,
}

/// Result of feeding one input into the machine.
#[derive(Debug, Default)]
pub struct Transition {
    pub effects: Vec<Effect>,
    pub error: Option<SessionError>,
}

impl Transition {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn effects(effects: Vec<Effect>) -> Self {
        Self {
            effects,
            error: None,
        }
    }

    pub fn error(error: SessionError) -> Self {
        Self {
            effects: Vec::new(),
            error: Some(error),
        }
    }

    pub fn with_error(mut self, error: SessionError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty() && self.error.is_none()
    }
}
