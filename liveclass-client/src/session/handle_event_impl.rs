use liveclass_core::{RelayEvent, SignalMessage};
use tracing::{debug, info, trace, warn};

use crate::error::SessionError;
use crate::negotiation::Input;
use crate::peer::{PeerState, RemoteStream};
use crate::session::session_actor::SessionActor;
use crate::session::session_event::{SessionEvent, Stamped};

impl SessionActor {
    pub(super) fn handle_event(&mut self, stamped: Stamped) {
        if stamped.generation != self.generation {
            trace!(
                stale = stamped.generation,
                current = self.generation,
                "Dropping event from an ended session"
            );
            return;
        }

        match stamped.event {
            SessionEvent::Input(input) => self.feed(input),
            SessionEvent::Relay(event) => self.handle_relay_event(event),
            SessionEvent::PeerState(state) => {
                debug!(?state, "Peer state changed");
                if state == PeerState::Failed {
                    self.feed(Input::PeerFailed("peer connection failed".into()));
                }
            }
            SessionEvent::RemoteTrack(track) => {
                let live = self
                    .active
                    .as_ref()
                    .is_some_and(|a| a.machine.phase().is_live());
                if !live {
                    debug!("Ignoring remote track after close");
                    return;
                }
                info!(stream = %track.stream_id, track = %track.track_id, "Remote track added");
                self.outputs
                    .remote
                    .send_modify(|current| *current = Some(RemoteStream::merge(current.take(), track)));
            }
            SessionEvent::Warning(error) => self.report(error),
            SessionEvent::Released => self.on_released(),
        }
    }

    fn feed(&mut self, input: Input) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let transition = active.machine.handle(input);
        self.apply(transition);
    }

    fn handle_relay_event(&mut self, event: RelayEvent) {
        match event {
            RelayEvent::Signal { from, payload } => match SignalMessage::from_payload(&payload) {
                Ok(message) => {
                    debug!(kind = message.kind(), from = ?from, "Signal received");
                    self.feed(Input::Signal { from, message });
                }
                Err(e) => {
                    warn!("Dropping malformed signal payload: {}", e);
                    self.report(SessionError::ProtocolViolation(format!(
                        "malformed signal payload: {e}"
                    )));
                }
            },
            RelayEvent::Joined { room_id, peer_id } => {
                debug!(room = %room_id, peer = %peer_id, "Relay acknowledged join");
            }
            RelayEvent::PeerJoined { peer_id } => info!(peer = %peer_id, "Peer joined the room"),
            RelayEvent::PeerLeft { peer_id } => info!(peer = %peer_id, "Peer left the room"),
            RelayEvent::Error { message } => {
                warn!("Relay rejected a frame: {}", message);
                self.report(SessionError::ProtocolViolation(message));
            }
        }
    }

    fn on_released(&mut self) {
        self.outputs.remote.send_replace(None);

        let Some(active) = self.active.as_mut() else {
            return;
        };
        let Some(error) = active.failure.take() else {
            return;
        };
        if let Some(reply) = active.pending_join.take() {
            let _ = reply.send(Err(error.clone()));
        }
        self.report(error);
    }
}
