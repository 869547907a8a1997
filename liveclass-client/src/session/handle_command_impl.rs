use liveclass_core::{PeerId, RoomId};
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::error::{Result, SessionError};
use crate::negotiation::{Input, NegotiationMachine, SessionState};
use crate::session::effect_runner::{EffectRunner, RunnerContext};
use crate::session::session_actor::{ActiveSession, SessionActor};
use crate::session::session_command::SessionCommand;

impl SessionActor {
    pub(super) async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Join { room, reply } => self.join(room, reply).await,
            SessionCommand::Call { reply } => {
                let _ = reply.send(self.call());
            }
            SessionCommand::Hangup { reply } => {
                self.hangup().await;
                let _ = reply.send(());
            }
        }
    }

    async fn join(&mut self, room: RoomId, reply: oneshot::Sender<Result<()>>) {
        if let Some(active) = &self.active {
            if active.machine.phase().is_live() {
                let error = SessionError::InvalidState(format!(
                    "join while {:?}",
                    active.machine.phase()
                ));
                self.report(error.clone());
                let _ = reply.send(Err(error));
                return;
            }
        }

        // A previous generation that ended on its own may still hold a runner.
        if let Some(mut previous) = self.active.take() {
            previous.runner.cancel();
            previous.runner.stopped().await;
        }

        self.generation += 1;
        let local_id = PeerId::new();
        info!(room = %room, peer = %local_id, generation = self.generation, "Joining room");

        let runner = EffectRunner::spawn(
            RunnerContext {
                generation: self.generation,
                local_id,
                room: room.clone(),
                relay_url: self.config.relay_url.clone(),
                ice_server: self.config.ice_server.clone(),
                constraints: self.config.constraints,
                relay: self.relay.clone(),
                peers: self.peers.clone(),
                devices: self.devices.clone(),
            },
            self.event_tx.clone(),
        );

        let mut machine = NegotiationMachine::new(SessionState::new(self.generation, local_id, room));
        let transition = machine.handle(Input::Join);
        self.outputs.remote.send_replace(None);
        self.active = Some(ActiveSession {
            machine,
            runner,
            pending_join: Some(reply),
            failure: None,
        });
        self.apply(transition);
    }

    fn call(&mut self) -> Result<()> {
        let Some(active) = self.active.as_mut() else {
            let error = SessionError::InvalidState("call before join".into());
            self.report(error.clone());
            return Err(error);
        };

        let transition = active.machine.handle(Input::Call);
        let result = match &transition.error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        };
        self.apply(transition);
        result
    }

    /// Closes the current generation and waits for its resources to be gone.
    async fn hangup(&mut self) {
        let Some(active) = self.active.as_mut() else {
            debug!("Hangup with no session");
            return;
        };

        let transition = active.machine.handle(Input::Hangup);
        if let Some(reply) = active.pending_join.take() {
            let _ = reply.send(Err(SessionError::Cancelled));
        }
        for effect in transition.effects {
            active.runner.submit(effect);
        }
        active.runner.cancel();
        active.runner.stopped().await;

        self.outputs.remote.send_replace(None);
        self.publish();
        info!(generation = self.generation, "Hung up");
    }
}
