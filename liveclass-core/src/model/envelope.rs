use crate::model::peer::PeerId;
use crate::model::room::RoomId;
use crate::model::signaling::SignalMessage;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frames a client publishes to the relay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    Join {
        room_id: RoomId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        peer_id: Option<PeerId>,
    },
    Signal {
        room_id: RoomId,
        payload: Value,
    },
    Leave {
        room_id: RoomId,
    },
}

impl ClientEvent {
    pub fn signal(room_id: RoomId, message: &SignalMessage) -> Result<Self, serde_json::Error> {
        Ok(Self::Signal {
            room_id,
            payload: message.to_payload()?,
        })
    }
}

/// Frames the relay delivers to room members.
///
/// `Signal::payload` is passed through untouched; receivers validate it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum RelayEvent {
    Signal {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<PeerId>,
        payload: Value,
    },
    Joined {
        room_id: RoomId,
        peer_id: PeerId,
    },
    PeerJoined {
        peer_id: PeerId,
    },
    PeerLeft {
        peer_id: PeerId,
    },
    Error {
        message: String,
    },
}
