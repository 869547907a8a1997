use liveclass_core::RoomId;
use tokio::sync::oneshot;

use crate::error::Result;

/// Requests the façade forwards to the session actor.
#[derive(Debug)]
pub enum SessionCommand {
    Join {
        room: RoomId,
        reply: oneshot::Sender<Result<()>>,
    },
    Call {
        reply: oneshot::Sender<Result<()>>,
    },
    Hangup {
        reply: oneshot::Sender<()>,
    },
}
