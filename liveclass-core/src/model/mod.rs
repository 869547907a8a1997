mod envelope;
mod peer;
mod room;
mod signaling;

pub use envelope::{ClientEvent, RelayEvent};
pub use peer::{PeerId, PeerIdError};
pub use room::RoomId;
pub use signaling::{IceCandidate, IceServerConfig, SdpType, SessionDescription, SignalMessage};
