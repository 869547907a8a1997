use liveclass_core::{IceCandidate, PeerId, SessionDescription, SignalMessage};
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::negotiation::{Effect, Input, Phase, SessionState, Transition};

/// Transition function of one negotiation. Performs no I/O: every outside
/// action is returned as an [`Effect`] for the caller to run.
#[derive(Debug)]
pub struct NegotiationMachine {
    state: SessionState,
}

impl NegotiationMachine {
    pub fn new(state: SessionState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn generation(&self) -> u64 {
        self.state.generation
    }

    pub fn handle(&mut self, input: Input) -> Transition {
        match input {
            Input::Join => self.on_join(),
            Input::MediaAcquired => self.on_media_acquired(),
            Input::MediaFailed(reason) => self.on_media_failed(reason),
            Input::RelayConnected => self.on_relay_connected(),
            Input::RelayDropped(reason) => self.close_with(SessionError::Connection(reason)),
            Input::Call => self.on_call(),
            Input::LocalOfferCreated(sdp) => self.on_local_offer(sdp),
            Input::LocalAnswerCreated(sdp) => self.on_local_answer(sdp),
            Input::RemoteDescriptionApplied => self.on_remote_description_applied(),
            Input::NegotiationFailed(reason) | Input::PeerFailed(reason) => {
                self.close_with(SessionError::Negotiation(reason))
            }
            Input::LocalCandidate(candidate) => self.on_local_candidate(candidate),
            Input::Signal { from, message } => self.on_signal(from, message),
            Input::Hangup => self.on_hangup(),
        }
    }

    fn on_join(&mut self) -> Transition {
        if self.state.phase != Phase::Idle {
            return Transition::error(SessionError::InvalidState(format!(
                "join while {:?}",
                self.state.phase
            )));
        }
        self.state.phase = Phase::AcquiringMedia;
        Transition::effects(vec![Effect::AcquireMedia])
    }

    fn on_media_acquired(&mut self) -> Transition {
        if self.state.phase != Phase::AcquiringMedia || self.state.has_local_media {
            debug!("Ignoring media completion in {:?}", self.state.phase);
            return Transition::none();
        }
        self.state.has_local_media = true;
        Transition::effects(vec![Effect::AttachTracks, Effect::ConnectRelay])
    }

    fn on_media_failed(&mut self, reason: String) -> Transition {
        if self.state.phase != Phase::AcquiringMedia {
            return Transition::none();
        }
        self.state.phase = Phase::Idle;
        self.state.has_local_media = false;
        Transition::effects(vec![Effect::ReleaseResources])
            .with_error(SessionError::MediaAccess(reason))
    }

    fn on_relay_connected(&mut self) -> Transition {
        if self.state.phase != Phase::AcquiringMedia || !self.state.has_local_media {
            debug!("Ignoring relay completion in {:?}", self.state.phase);
            return Transition::none();
        }
        info!(room = %self.state.room, "Joined room");
        self.state.phase = Phase::Joined;
        Transition::none()
    }

    fn on_call(&mut self) -> Transition {
        if self.state.phase != Phase::Joined {
            return Transition::error(SessionError::InvalidState(format!(
                "call while {:?}",
                self.state.phase
            )));
        }
        self.state.phase = Phase::Offering;
        self.state.local_offer = None;
        Transition::effects(vec![Effect::CreateOffer])
    }

    fn on_local_offer(&mut self, sdp: SessionDescription) -> Transition {
        if self.state.phase != Phase::Offering || self.state.local_offer.is_some() {
            debug!("Discarding local offer produced in {:?}", self.state.phase);
            return Transition::none();
        }
        self.state.local_offer = Some(sdp.clone());
        Transition::effects(vec![Effect::Send(SignalMessage::Offer { sdp })])
    }

    fn on_local_answer(&mut self, sdp: SessionDescription) -> Transition {
        if self.state.phase != Phase::Answering || !self.state.remote_description_set {
            debug!("Discarding local answer produced in {:?}", self.state.phase);
            return Transition::none();
        }
        self.state.phase = Phase::Connected;
        self.state.sent_answer = Some(sdp.clone());
        Transition::effects(vec![Effect::Send(SignalMessage::Answer { sdp })])
    }

    fn on_remote_description_applied(&mut self) -> Transition {
        let answering = match self.state.phase {
            Phase::Answering => true,
            Phase::Connected => false,
            _ => return Transition::none(),
        };
        if self.state.remote_description_set {
            return Transition::none();
        }
        self.state.remote_description_set = true;

        let mut effects = self.flush_candidates();
        if answering {
            effects.push(Effect::CreateAnswer);
        }
        Transition::effects(effects)
    }

    fn on_local_candidate(&mut self, candidate: IceCandidate) -> Transition {
        if !self.state.phase.is_live() {
            return Transition::none();
        }
        Transition::effects(vec![Effect::Send(SignalMessage::IceCandidate {
            candidate,
        })])
    }

    fn on_signal(&mut self, from: Option<PeerId>, message: SignalMessage) -> Transition {
        if from == Some(self.state.local_id) {
            debug!("Ignoring echoed {} message", message.kind());
            return Transition::none();
        }

        match message {
            SignalMessage::Offer { sdp } => self.on_remote_offer(from, sdp),
            SignalMessage::Answer { sdp } => self.on_remote_answer(sdp),
            SignalMessage::IceCandidate { candidate } => self.on_remote_candidate(candidate),
        }
    }

    fn on_remote_offer(&mut self, from: Option<PeerId>, sdp: SessionDescription) -> Transition {
        match self.state.phase {
            Phase::Joined => self.accept_offer(sdp),
            Phase::Offering => {
                if self.state.local_offer.as_ref() == Some(&sdp) {
                    debug!("Ignoring echo of our own offer");
                    return Transition::none();
                }
                let Some(remote) = from else {
                    return violation("offer without sender id while offering");
                };
                if self.state.local_id < remote {
                    info!(local = %self.state.local_id, %remote, "Glare: yielding to remote offer");
                    self.state.local_offer = None;
                    self.accept_offer(sdp)
                } else {
                    info!(local = %self.state.local_id, %remote, "Glare: keeping local offer");
                    Transition::none()
                }
            }
            Phase::Answering | Phase::Connected => {
                violation("offer while a negotiation is already in progress")
            }
            Phase::Closed => Transition::none(),
            Phase::Idle | Phase::AcquiringMedia => violation("offer before the room was joined"),
        }
    }

    fn accept_offer(&mut self, sdp: SessionDescription) -> Transition {
        self.state.phase = Phase::Answering;
        self.state.remote_description_set = false;
        self.state.remote_ufrag = sdp.ice_ufrag().map(str::to_owned);
        self.state.sent_answer = None;
        Transition::effects(vec![Effect::ApplyRemoteDescription(sdp)])
    }

    fn on_remote_answer(&mut self, sdp: SessionDescription) -> Transition {
        match self.state.phase {
            Phase::Offering if self.state.local_offer.is_some() => {
                self.state.phase = Phase::Connected;
                self.state.remote_description_set = false;
                self.state.remote_ufrag = sdp.ice_ufrag().map(str::to_owned);
                Transition::effects(vec![Effect::ApplyRemoteDescription(sdp)])
            }
            Phase::Connected if self.state.sent_answer.as_ref() == Some(&sdp) => {
                debug!("Ignoring echo of our own answer");
                Transition::none()
            }
            Phase::Closed => Transition::none(),
            _ => violation("answer with no outstanding offer"),
        }
    }

    fn on_remote_candidate(&mut self, candidate: IceCandidate) -> Transition {
        match self.state.phase {
            Phase::Idle | Phase::Closed => {
                debug!("Dropping candidate, negotiation not running");
                Transition::none()
            }
            _ if self.state.remote_description_set => {
                if self.is_stale(&candidate) {
                    debug!("Dropping candidate of an abandoned ICE session");
                    return Transition::none();
                }
                Transition::effects(vec![Effect::AddIceCandidate(candidate)])
            }
            _ => {
                self.state.pending_candidates.push(candidate);
                debug!(
                    queued = self.state.pending_candidates.len(),
                    "Queued early candidate"
                );
                Transition::none()
            }
        }
    }

    fn on_hangup(&mut self) -> Transition {
        match self.state.phase {
            Phase::Closed => Transition::none(),
            Phase::Idle => {
                self.state.phase = Phase::Closed;
                Transition::none()
            }
            _ => {
                self.shut_down();
                Transition::effects(vec![Effect::ReleaseResources])
            }
        }
    }

    fn close_with(&mut self, error: SessionError) -> Transition {
        if !self.state.phase.is_live() {
            return Transition::none();
        }
        warn!(phase = ?self.state.phase, "Closing session: {}", error);
        self.shut_down();
        Transition::effects(vec![Effect::ReleaseResources]).with_error(error)
    }

    fn shut_down(&mut self) {
        self.state.phase = Phase::Closed;
        self.state.has_local_media = false;
        self.state.pending_candidates.clear();
    }

    /// Flushes queued candidates in arrival order. Candidates stamped with a
    /// username fragment other than the remote description's belong to an
    /// offer that lost glare and are dropped.
    fn flush_candidates(&mut self) -> Vec<Effect> {
        let pending = std::mem::take(&mut self.state.pending_candidates);
        let queued = pending.len();
        let effects: Vec<Effect> = pending
            .into_iter()
            .filter(|c| !self.is_stale(c))
            .map(Effect::AddIceCandidate)
            .collect();
        if effects.len() < queued {
            debug!(dropped = queued - effects.len(), "Dropped candidates of an abandoned ICE session");
        }
        effects
    }

    fn is_stale(&self, candidate: &IceCandidate) -> bool {
        match (&candidate.username_fragment, &self.state.remote_ufrag) {
            (Some(theirs), Some(expected)) => theirs != expected,
            _ => false,
        }
    }
}

fn violation(reason: &str) -> Transition {
    warn!("Dropping signaling message: {}", reason);
    Transition::error(SessionError::ProtocolViolation(reason.to_owned()))
}
