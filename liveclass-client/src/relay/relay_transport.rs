use async_trait::async_trait;
use liveclass_core::{PeerId, RelayEvent, RoomId, SignalMessage};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::error::Result;

/// What a relay channel reports to its subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Relay(RelayEvent),
    /// The channel dropped. Delivered at most once, and never after `close`.
    Disconnected(String),
}

pub type ChannelHandler = Box<dyn Fn(ChannelEvent) + Send + Sync>;

/// Opens channels to a room relay.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    /// Fails with `SessionError::Connection` when the relay is unreachable.
    async fn connect(&self, url: &str) -> Result<Arc<dyn RelayChannel>>;
}

/// One open connection to the relay.
///
/// Sends are best effort and FIFO per channel. Echo suppression is left to
/// the subscriber.
#[async_trait]
pub trait RelayChannel: Send + Sync {
    async fn join_room(&self, room: &RoomId, peer: PeerId) -> Result<()>;

    async fn send(&self, room: &RoomId, message: &SignalMessage) -> Result<()>;

    /// Events that arrived before a handler was set are replayed to it.
    fn on_message(&self, handler: ChannelHandler);

    /// Idempotent.
    async fn close(&self);
}

enum DispatchState {
    Buffering(Vec<ChannelEvent>),
    Attached(Arc<dyn Fn(ChannelEvent) + Send + Sync>),
}

/// Fans inbound events to the channel's single subscriber.
pub(crate) struct Dispatcher {
    state: Mutex<DispatchState>,
    finished: Mutex<bool>,
}

impl Dispatcher {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(DispatchState::Buffering(Vec::new())),
            finished: Mutex::new(false),
        }
    }

    pub(crate) fn deliver(&self, event: RelayEvent) {
        if *self.finished.lock() {
            return;
        }
        self.push(ChannelEvent::Relay(event));
    }

    /// Reports the drop unless the channel already finished.
    pub(crate) fn disconnect(&self, reason: impl Into<String>) {
        {
            let mut finished = self.finished.lock();
            if *finished {
                return;
            }
            *finished = true;
        }
        self.push(ChannelEvent::Disconnected(reason.into()));
    }

    /// Silences the channel without a `Disconnected` notice.
    pub(crate) fn finish(&self) {
        *self.finished.lock() = true;
    }

    pub(crate) fn is_finished(&self) -> bool {
        *self.finished.lock()
    }

    pub(crate) fn attach(&self, handler: ChannelHandler) {
        let handler: Arc<dyn Fn(ChannelEvent) + Send + Sync> = Arc::from(handler);
        let mut state = self.state.lock();
        let previous = std::mem::replace(&mut *state, DispatchState::Attached(handler.clone()));
        if let DispatchState::Buffering(backlog) = previous {
            for event in backlog {
                handler(event);
            }
        }
    }

    fn push(&self, event: ChannelEvent) {
        // Delivered under the lock so a concurrent `attach` cannot reorder events.
        let mut state = self.state.lock();
        match &mut *state {
            DispatchState::Buffering(backlog) => backlog.push(event),
            DispatchState::Attached(handler) => handler(event),
        }
    }
}
