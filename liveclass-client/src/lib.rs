//! Client side of a two-party live class: relay signaling, offer/answer
//! negotiation and local media lifecycle behind one [`Session`] façade.

pub mod config;
pub mod error;
pub mod media;
pub mod negotiation;
pub mod peer;
pub mod relay;
pub mod session;

pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use media::{MediaConstraints, MediaDevices, SyntheticDevices, TrackKind};
pub use negotiation::{Phase, Status};
pub use peer::{PeerConnection, PeerConnector, RemoteStream, RemoteTrack, RtcConnector};
pub use relay::{LocalRelay, RelayChannel, RelayTransport, WsRelay};
pub use session::Session;
