mod effect_runner;
mod handle_command_impl;
mod handle_event_impl;
mod session_actor;
mod session_command;
mod session_event;

use liveclass_core::RoomId;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::media::MediaDevices;
use crate::negotiation::{Phase, Status};
use crate::peer::{PeerConnector, RemoteStream};
use crate::relay::RelayTransport;

use session_actor::{Outputs, SessionActor};
use session_command::SessionCommand;

const COMMAND_QUEUE: usize = 32;
const ERROR_BACKLOG: usize = 64;

/// Entry point for the presentation layer.
///
/// Cloning yields another handle to the same session. The session actor stops
/// once every handle is dropped.
#[derive(Clone)]
pub struct Session {
    commands: mpsc::Sender<SessionCommand>,
    status: watch::Receiver<Status>,
    phase: watch::Receiver<Phase>,
    errors: broadcast::Sender<SessionError>,
    remote: watch::Receiver<Option<RemoteStream>>,
}

impl Session {
    /// Spawns the session actor. Must be called inside a tokio runtime.
    pub fn new(
        config: SessionConfig,
        relay: Arc<dyn RelayTransport>,
        peers: Arc<dyn PeerConnector>,
        devices: Arc<dyn MediaDevices>,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let (status_tx, status_rx) = watch::channel(Status::Idle);
        let (phase_tx, phase_rx) = watch::channel(Phase::Idle);
        let (errors_tx, _) = broadcast::channel(ERROR_BACKLOG);
        let (remote_tx, remote_rx) = watch::channel(None);

        let actor = SessionActor::new(
            config,
            relay,
            peers,
            devices,
            command_rx,
            Outputs {
                status: status_tx,
                phase: phase_tx,
                errors: errors_tx.clone(),
                remote: remote_tx,
            },
        );
        tokio::spawn(actor.run());

        Self {
            commands: command_tx,
            status: status_rx,
            phase: phase_rx,
            errors: errors_tx,
            remote: remote_rx,
        }
    }

    /// Acquires local media, connects to the relay and joins `room`.
    ///
    /// Resolves once the room is joined, or with the failure. Rejected with
    /// `InvalidState` while a session is live and with `Cancelled` when
    /// `hangup` interrupts it.
    pub async fn join(&self, room: impl Into<RoomId>) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Join {
            room: room.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| stopped())?
    }

    /// Places the call. Only valid once joined.
    pub async fn call(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Call { reply }).await?;
        rx.await.map_err(|_| stopped())?
    }

    /// Ends the session. Returns after every resource has been released.
    /// Never fails and may be called any number of times.
    pub async fn hangup(&self) {
        let (reply, rx) = oneshot::channel();
        if self.send(SessionCommand::Hangup { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }

    pub fn status(&self) -> watch::Receiver<Status> {
        self.status.clone()
    }

    pub fn errors(&self) -> broadcast::Receiver<SessionError> {
        self.errors.subscribe()
    }

    pub fn remote_stream(&self) -> watch::Receiver<Option<RemoteStream>> {
        self.remote.clone()
    }

    /// Current negotiation phase, for diagnostics.
    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    async fn send(&self, cmd: SessionCommand) -> Result<()> {
        self.commands.send(cmd).await.map_err(|_| stopped())
    }
}

fn stopped() -> SessionError {
    SessionError::InvalidState("session actor stopped".into())
}
