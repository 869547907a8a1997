use liveclass_core::{IceServerConfig, PeerId, RoomId};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::media::{LocalMediaHandle, MediaConstraints, MediaDevices, MediaSessionManager};
use crate::negotiation::{Effect, Input};
use crate::peer::{PeerConnection, PeerConnector, PeerState};
use crate::relay::{ChannelEvent, RelayChannel, RelayTransport};
use crate::session::session_event::{SessionEvent, Stamped};

/// What one runner needs to reach the outside world.
pub struct RunnerContext {
    pub generation: u64,
    pub local_id: PeerId,
    pub room: RoomId,
    pub relay_url: String,
    pub ice_server: IceServerConfig,
    pub constraints: MediaConstraints,
    pub relay: Arc<dyn RelayTransport>,
    pub peers: Arc<dyn PeerConnector>,
    pub devices: Arc<dyn MediaDevices>,
}

/// The actor's side of a running [`EffectRunner`].
pub struct RunnerHandle {
    effects: Option<mpsc::UnboundedSender<Effect>>,
    cancel: watch::Sender<bool>,
    done: Option<oneshot::Receiver<()>>,
}

impl RunnerHandle {
    pub fn submit(&self, effect: Effect) {
        if let Some(tx) = &self.effects {
            if tx.send(effect).is_err() {
                debug!("Effect runner already stopped");
            }
        }
    }

    /// Interrupts the running effect and stops accepting new ones. The runner
    /// releases everything it owns before reporting done.
    pub fn cancel(&mut self) {
        let _ = self.cancel.send(true);
        self.effects = None;
    }

    /// Resolves once the runner has released its resources and exited.
    pub async fn stopped(&mut self) {
        if let Some(done) = self.done.take() {
            let _ = done.await;
        }
    }
}

enum Outcome {
    Continue,
    Cancelled,
}

/// Executes one generation's effects in order and owns its resources: the
/// local media, the peer connection and the relay channel.
pub struct EffectRunner {
    ctx: RunnerContext,
    media: Arc<MediaSessionManager>,
    handle: Option<Arc<LocalMediaHandle>>,
    peer: Option<Arc<dyn PeerConnection>>,
    channel: Option<Arc<dyn RelayChannel>>,
    events: mpsc::UnboundedSender<Stamped>,
    effects: mpsc::UnboundedReceiver<Effect>,
    cancel: watch::Receiver<bool>,
}

impl EffectRunner {
    pub fn spawn(ctx: RunnerContext, events: mpsc::UnboundedSender<Stamped>) -> RunnerHandle {
        let (effects_tx, effects_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (done_tx, done_rx) = oneshot::channel();

        let runner = EffectRunner {
            media: Arc::new(MediaSessionManager::new(ctx.devices.clone())),
            ctx,
            handle: None,
            peer: None,
            channel: None,
            events,
            effects: effects_rx,
            cancel: cancel_rx,
        };

        tokio::spawn(async move {
            runner.run().await;
            let _ = done_tx.send(());
        });

        RunnerHandle {
            effects: Some(effects_tx),
            cancel: cancel_tx,
            done: Some(done_rx),
        }
    }

    async fn run(mut self) {
        debug!(generation = self.ctx.generation, "Effect runner started");

        loop {
            let effect = tokio::select! {
                biased;
                _ = self.cancel.wait_for(|c| *c) => break,
                effect = self.effects.recv() => match effect {
                    Some(effect) => effect,
                    None => break,
                },
            };

            if let Outcome::Cancelled = self.execute(effect).await {
                break;
            }
        }

        self.release().await;
        debug!(generation = self.ctx.generation, "Effect runner stopped");
    }

    fn post(&self, event: SessionEvent) {
        let _ = self.events.send(Stamped {
            generation: self.ctx.generation,
            event,
        });
    }

    fn complete(&self, input: Input) {
        self.post(SessionEvent::Input(input));
    }

    /// Runs `op` unless `hangup` interrupts it first.
    async fn guarded<F: Future>(&self, op: F) -> Option<F::Output> {
        let mut cancel = self.cancel.clone();
        tokio::select! {
            biased;
            _ = cancel.wait_for(|c| *c) => None,
            out = op => Some(out),
        }
    }

    async fn execute(&mut self, effect: Effect) -> Outcome {
        debug!(generation = self.ctx.generation, ?effect, "Running effect");

        match effect {
            Effect::AcquireMedia => self.acquire_media().await,
            Effect::AttachTracks => self.attach_tracks().await,
            Effect::ConnectRelay => self.connect_relay().await,
            Effect::CreateOffer => {
                let Some(peer) = self.peer.clone() else {
                    self.complete(Input::NegotiationFailed("no peer connection".into()));
                    return Outcome::Continue;
                };
                match self.guarded(peer.create_offer()).await {
                    None => Outcome::Cancelled,
                    Some(Ok(sdp)) => {
                        self.complete(Input::LocalOfferCreated(sdp));
                        Outcome::Continue
                    }
                    Some(Err(e)) => {
                        self.complete(Input::NegotiationFailed(e.reason()));
                        Outcome::Continue
                    }
                }
            }
            Effect::CreateAnswer => {
                let Some(peer) = self.peer.clone() else {
                    self.complete(Input::NegotiationFailed("no peer connection".into()));
                    return Outcome::Continue;
                };
                match self.guarded(peer.create_answer()).await {
                    None => Outcome::Cancelled,
                    Some(Ok(sdp)) => {
                        self.complete(Input::LocalAnswerCreated(sdp));
                        Outcome::Continue
                    }
                    Some(Err(e)) => {
                        self.complete(Input::NegotiationFailed(e.reason()));
                        Outcome::Continue
                    }
                }
            }
            Effect::ApplyRemoteDescription(sdp) => {
                let Some(peer) = self.peer.clone() else {
                    self.complete(Input::NegotiationFailed("no peer connection".into()));
                    return Outcome::Continue;
                };
                match self.guarded(peer.apply_remote_description(sdp)).await {
                    None => Outcome::Cancelled,
                    Some(Ok(())) => {
                        self.complete(Input::RemoteDescriptionApplied);
                        Outcome::Continue
                    }
                    Some(Err(e)) => {
                        self.complete(Input::NegotiationFailed(e.reason()));
                        Outcome::Continue
                    }
                }
            }
            Effect::AddIceCandidate(candidate) => {
                let Some(peer) = self.peer.clone() else {
                    return Outcome::Continue;
                };
                match self.guarded(peer.add_ice_candidate(candidate)).await {
                    None => Outcome::Cancelled,
                    Some(Ok(())) => Outcome::Continue,
                    Some(Err(e)) => {
                        warn!("Remote candidate rejected: {}", e);
                        self.post(SessionEvent::Warning(SessionError::ProtocolViolation(
                            format!("candidate rejected: {e}"),
                        )));
                        Outcome::Continue
                    }
                }
            }
            Effect::Send(message) => {
                let Some(channel) = self.channel.clone() else {
                    warn!(kind = message.kind(), "No relay channel, message dropped");
                    return Outcome::Continue;
                };
                if let Err(e) = channel.send(&self.ctx.room, &message).await {
                    self.complete(Input::RelayDropped(e.reason()));
                }
                Outcome::Continue
            }
            Effect::ReleaseResources => {
                self.release().await;
                Outcome::Continue
            }
        }
    }

    async fn acquire_media(&mut self) -> Outcome {
        let media = self.media.clone();
        let constraints = self.ctx.constraints;
        let mut task = tokio::spawn(async move { media.acquire_local_media(&constraints).await });

        let joined = match self.guarded(&mut task).await {
            Some(joined) => joined,
            None => {
                // Late acquisitions are stopped as soon as they land.
                let media = self.media.clone();
                tokio::spawn(async move {
                    if let Ok(Ok(handle)) = task.await {
                        info!("Discarding media acquired after hangup");
                        media.release(&handle);
                    }
                });
                return Outcome::Cancelled;
            }
        };

        match joined {
            Ok(Ok(handle)) => {
                self.handle = Some(Arc::new(handle));
                self.complete(Input::MediaAcquired);
            }
            Ok(Err(e)) => self.complete(Input::MediaFailed(e.reason())),
            Err(e) => self.complete(Input::MediaFailed(format!("capture task failed: {e}"))),
        }
        Outcome::Continue
    }

    async fn attach_tracks(&mut self) -> Outcome {
        let Some(handle) = self.handle.clone() else {
            self.complete(Input::NegotiationFailed("no local media to attach".into()));
            return Outcome::Continue;
        };

        let peer = match self.peer.clone() {
            Some(peer) => peer,
            None => {
                let connector = self.ctx.peers.clone();
                let ice_server = self.ctx.ice_server.clone();
                match self.guarded(connector.connect(&ice_server)).await {
                    None => return Outcome::Cancelled,
                    Some(Err(e)) => {
                        self.complete(Input::NegotiationFailed(e.reason()));
                        return Outcome::Continue;
                    }
                    Some(Ok(peer)) => {
                        self.wire_peer(peer.as_ref());
                        self.peer = Some(peer.clone());
                        peer
                    }
                }
            }
        };

        let media = self.media.clone();
        match self.guarded(media.attach_tracks(peer.as_ref(), &handle)).await {
            None => Outcome::Cancelled,
            Some(Ok(_)) => Outcome::Continue,
            Some(Err(e)) => {
                self.complete(Input::NegotiationFailed(e.reason()));
                Outcome::Continue
            }
        }
    }

    fn wire_peer(&self, peer: &dyn PeerConnection) {
        let generation = self.ctx.generation;

        let events = self.events.clone();
        peer.on_local_candidate(Box::new(move |candidate| {
            let _ = events.send(Stamped {
                generation,
                event: SessionEvent::Input(Input::LocalCandidate(candidate)),
            });
        }));

        let events = self.events.clone();
        self.media.on_remote_track(
            peer,
            Box::new(move |track| {
                let _ = events.send(Stamped {
                    generation,
                    event: SessionEvent::RemoteTrack(track),
                });
            }),
        );

        let events = self.events.clone();
        peer.on_state_change(Box::new(move |state: PeerState| {
            let _ = events.send(Stamped {
                generation,
                event: SessionEvent::PeerState(state),
            });
        }));
    }

    async fn connect_relay(&mut self) -> Outcome {
        let relay = self.ctx.relay.clone();
        let url = self.ctx.relay_url.clone();
        let channel = match self.guarded(relay.connect(&url)).await {
            None => return Outcome::Cancelled,
            Some(Err(e)) => {
                self.complete(Input::RelayDropped(e.reason()));
                return Outcome::Continue;
            }
            Some(Ok(channel)) => channel,
        };

        let generation = self.ctx.generation;
        let events = self.events.clone();
        channel.on_message(Box::new(move |event| {
            let event = match event {
                ChannelEvent::Relay(event) => SessionEvent::Relay(event),
                ChannelEvent::Disconnected(reason) => {
                    SessionEvent::Input(Input::RelayDropped(reason))
                }
            };
            let _ = events.send(Stamped { generation, event });
        }));
        self.channel = Some(channel.clone());

        let (room, local_id) = (self.ctx.room.clone(), self.ctx.local_id);
        match self.guarded(channel.join_room(&room, local_id)).await {
            None => Outcome::Cancelled,
            Some(Ok(())) => {
                self.complete(Input::RelayConnected);
                Outcome::Continue
            }
            Some(Err(e)) => {
                self.complete(Input::RelayDropped(e.reason()));
                Outcome::Continue
            }
        }
    }

    /// Leaves the relay, closes the peer and stops local capture. Safe to call
    /// repeatedly; only the first call after acquiring anything reports.
    async fn release(&mut self) {
        let channel = self.channel.take();
        let peer = self.peer.take();
        let handle = self.handle.take();
        let had_resources = channel.is_some() || peer.is_some() || handle.is_some();

        if let Some(channel) = channel {
            channel.close().await;
        }
        if let Some(peer) = peer {
            if let Err(e) = peer.close().await {
                warn!("Failed to close peer connection: {}", e);
            }
        }
        if let Some(handle) = handle {
            self.media.release(&handle);
        }
        let abandoned = self.media.abandon_acquisition();

        if had_resources || abandoned > 0 {
            info!(generation = self.ctx.generation, "Session resources released");
        }
        self.post(SessionEvent::Released);
    }
}
