mod peer_connection;
mod rtc_peer;

pub use peer_connection::{
    CandidateHandler, PeerConnection, PeerConnector, PeerState, RemoteStream, RemoteTrack,
    RemoteTrackHandler, StateHandler,
};
pub use rtc_peer::{RtcConnector, RtcPeer};
