use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::media::MediaDevices;
use crate::negotiation::{Effect, NegotiationMachine, Phase, Status, Transition};
use crate::peer::{PeerConnector, RemoteStream};
use crate::relay::RelayTransport;
use crate::session::effect_runner::RunnerHandle;
use crate::session::session_command::SessionCommand;
use crate::session::session_event::Stamped;

/// State of the generation started by the latest `join`.
pub(super) struct ActiveSession {
    pub(super) machine: NegotiationMachine,
    pub(super) runner: RunnerHandle,
    pub(super) pending_join: Option<oneshot::Sender<Result<()>>>,
    /// Terminal error held back until the runner reports the release.
    pub(super) failure: Option<SessionError>,
}

/// Observables the actor publishes for the façade.
pub(super) struct Outputs {
    pub(super) status: watch::Sender<Status>,
    pub(super) phase: watch::Sender<Phase>,
    pub(super) errors: broadcast::Sender<SessionError>,
    pub(super) remote: watch::Sender<Option<RemoteStream>>,
}

/// Serializes user commands, relay and peer events and effect completions
/// for one façade.
pub struct SessionActor {
    pub(super) config: SessionConfig,
    pub(super) relay: Arc<dyn RelayTransport>,
    pub(super) peers: Arc<dyn PeerConnector>,
    pub(super) devices: Arc<dyn MediaDevices>,
    pub(super) command_rx: mpsc::Receiver<SessionCommand>,
    pub(super) event_rx: mpsc::UnboundedReceiver<Stamped>,
    pub(super) event_tx: mpsc::UnboundedSender<Stamped>,
    pub(super) generation: u64,
    pub(super) active: Option<ActiveSession>,
    pub(super) outputs: Outputs,
}

impl SessionActor {
    pub(super) fn new(
        config: SessionConfig,
        relay: Arc<dyn RelayTransport>,
        peers: Arc<dyn PeerConnector>,
        devices: Arc<dyn MediaDevices>,
        command_rx: mpsc::Receiver<SessionCommand>,
        outputs: Outputs,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Self {
            config,
            relay,
            peers,
            devices,
            command_rx,
            event_rx,
            event_tx,
            generation: 0,
            active: None,
            outputs,
        }
    }

    /// Main loop. Runs until every façade handle is dropped.
    pub async fn run(mut self) {
        info!("Session actor started");

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("All session handles dropped. Shutting down.");
                            break;
                        }
                    }
                }

                evt = self.event_rx.recv() => {
                    // The actor holds a sender, so the channel never closes here.
                    if let Some(e) = evt {
                        self.handle_event(e);
                    }
                }
            }
        }

        if let Some(mut active) = self.active.take() {
            active.runner.cancel();
            active.runner.stopped().await;
        }
        info!("Session actor finished");
    }

    /// Hands a transition's effects to the runner and publishes the new phase.
    pub(super) fn apply(&mut self, transition: Transition) {
        let Some(active) = self.active.as_mut() else {
            return;
        };

        let releases = transition.effects.contains(&Effect::ReleaseResources);
        for effect in transition.effects {
            active.runner.submit(effect);
        }

        if let Some(error) = transition.error {
            if releases {
                debug!("Holding back {} until resources are released", error);
                active.failure = Some(error);
            } else {
                self.report(error);
            }
        }

        self.publish();
    }

    pub(super) fn publish(&mut self) {
        let phase = match self.active.as_mut() {
            Some(active) => {
                let phase = active.machine.phase();
                if phase == Phase::Joined {
                    if let Some(reply) = active.pending_join.take() {
                        let _ = reply.send(Ok(()));
                    }
                }
                phase
            }
            None => Phase::Idle,
        };

        self.outputs.phase.send_if_modified(|current| {
            let changed = *current != phase;
            *current = phase;
            changed
        });
        self.outputs.status.send_if_modified(|current| {
            let status = phase.status();
            let changed = *current != status;
            *current = status;
            changed
        });
    }

    pub(super) fn report(&self, error: SessionError) {
        // No subscribers is fine.
        let _ = self.outputs.errors.send(error);
    }
}
