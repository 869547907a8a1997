use async_trait::async_trait;
use dashmap::DashMap;
use liveclass_core::{PeerId, RelayEvent, RoomId, SignalMessage};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use super::relay_transport::{ChannelHandler, Dispatcher, RelayChannel, RelayTransport};
use crate::error::{Result, SessionError};

#[derive(Default)]
struct Hub {
    rooms: DashMap<RoomId, Vec<(PeerId, Arc<Dispatcher>)>>,
    channels: Mutex<Vec<Arc<Dispatcher>>>,
    offline: AtomicBool,
}

impl Hub {
    fn members(&self, room: &RoomId) -> Vec<(PeerId, Arc<Dispatcher>)> {
        self.rooms
            .get(room)
            .map(|members| members.value().clone())
            .unwrap_or_default()
    }

    fn leave(&self, room: &RoomId, peer: PeerId) {
        let emptied = match self.rooms.get_mut(room) {
            Some(mut members) => {
                members.retain(|(id, _)| *id != peer);
                members.is_empty()
            }
            None => return,
        };
        if emptied {
            self.rooms.remove_if(room, |_, members| members.is_empty());
            debug!(room = %room, "room removed");
        }
        for (_, member) in self.members(room) {
            member.deliver(RelayEvent::PeerLeft { peer_id: peer });
        }
    }
}

/// In-process relay hub.
///
/// Clones share one hub, so every channel opened from any clone meets the
/// others. The URL passed to `connect` is ignored.
#[derive(Clone, Default)]
pub struct LocalRelay {
    hub: Arc<Hub>,
    echo: bool,
}

impl LocalRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also delivers a sender's signals back to itself.
    pub fn with_echo(mut self) -> Self {
        self.echo = true;
        self
    }

    /// Makes further `connect` calls fail as if the relay were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.hub.offline.store(offline, Ordering::SeqCst);
    }

    /// Drops every open channel as if the relay went away.
    pub fn drop_all(&self) {
        let channels = std::mem::take(&mut *self.hub.channels.lock());
        self.hub.rooms.clear();
        for channel in channels {
            channel.disconnect("relay went away");
        }
    }

    /// Delivers an unchecked signal payload to every member of `room`.
    pub fn inject(&self, room: &RoomId, from: Option<PeerId>, payload: Value) {
        for (_, member) in self.hub.members(room) {
            member.deliver(RelayEvent::Signal {
                from,
                payload: payload.clone(),
            });
        }
    }

    pub fn room_size(&self, room: &RoomId) -> usize {
        self.hub.rooms.get(room).map(|m| m.len()).unwrap_or(0)
    }

    pub fn room_count(&self) -> usize {
        self.hub.rooms.len()
    }
}

#[async_trait]
impl RelayTransport for LocalRelay {
    async fn connect(&self, _url: &str) -> Result<Arc<dyn RelayChannel>> {
        if self.hub.offline.load(Ordering::SeqCst) {
            return Err(SessionError::Connection("local relay is offline".into()));
        }
        let dispatcher = Arc::new(Dispatcher::new());
        self.hub.channels.lock().push(dispatcher.clone());

        Ok(Arc::new(LocalChannel {
            hub: self.hub.clone(),
            dispatcher,
            echo: self.echo,
            membership: Mutex::new(None),
        }))
    }
}

struct LocalChannel {
    hub: Arc<Hub>,
    dispatcher: Arc<Dispatcher>,
    echo: bool,
    membership: Mutex<Option<(RoomId, PeerId)>>,
}

impl LocalChannel {
    fn ensure_open(&self) -> Result<()> {
        if self.dispatcher.is_finished() {
            return Err(SessionError::Connection("relay channel closed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RelayChannel for LocalChannel {
    async fn join_room(&self, room: &RoomId, peer: PeerId) -> Result<()> {
        self.ensure_open()?;

        let previous = self.membership.lock().replace((room.clone(), peer));
        if let Some((old_room, old_peer)) = previous {
            self.hub.leave(&old_room, old_peer);
        }

        for (_, member) in self.hub.members(room) {
            member.deliver(RelayEvent::PeerJoined { peer_id: peer });
        }
        self.hub
            .rooms
            .entry(room.clone())
            .or_default()
            .push((peer, self.dispatcher.clone()));

        info!(room = %room, peer = %peer, "peer joined local room");
        self.dispatcher.deliver(RelayEvent::Joined {
            room_id: room.clone(),
            peer_id: peer,
        });
        Ok(())
    }

    async fn send(&self, room: &RoomId, message: &SignalMessage) -> Result<()> {
        self.ensure_open()?;

        let sender = match self.membership.lock().as_ref() {
            Some((joined, peer)) if joined == room => *peer,
            _ => {
                self.dispatcher.deliver(RelayEvent::Error {
                    message: format!("not a member of room {room}"),
                });
                return Ok(());
            }
        };
        let payload = message
            .to_payload()
            .map_err(|e| SessionError::ProtocolViolation(e.to_string()))?;

        for (id, member) in self.hub.members(room) {
            if id == sender && !self.echo {
                continue;
            }
            member.deliver(RelayEvent::Signal {
                from: Some(sender),
                payload: payload.clone(),
            });
        }
        Ok(())
    }

    fn on_message(&self, handler: ChannelHandler) {
        self.dispatcher.attach(handler);
    }

    async fn close(&self) {
        self.dispatcher.finish();
        let membership = self.membership.lock().take();
        if let Some((room, peer)) = membership {
            self.hub.leave(&room, peer);
        }
        self.hub
            .channels
            .lock()
            .retain(|d| !Arc::ptr_eq(d, &self.dispatcher));
    }
}
