use async_trait::async_trait;
use liveclass_core::{IceCandidate, IceServerConfig, SessionDescription};
use std::sync::Arc;
use webrtc::track::track_local::TrackLocal;

use crate::error::Result;
use crate::media::TrackKind;

/// Connection state reported by the underlying peer transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// A media track the remote peer started sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub stream_id: String,
    pub track_id: String,
    pub kind: TrackKind,
}

/// The remote peer's stream as seen so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStream {
    pub stream_id: String,
    pub tracks: Vec<RemoteTrack>,
}

impl RemoteStream {
    /// Folds `track` into `current`. A track from another stream replaces it.
    pub fn merge(current: Option<RemoteStream>, track: RemoteTrack) -> RemoteStream {
        match current {
            Some(mut stream) if stream.stream_id == track.stream_id => {
                if !stream.tracks.iter().any(|t| t.track_id == track.track_id) {
                    stream.tracks.push(track);
                }
                stream
            }
            _ => RemoteStream {
                stream_id: track.stream_id.clone(),
                tracks: vec![track],
            },
        }
    }
}

pub type CandidateHandler = Box<dyn Fn(IceCandidate) + Send + Sync>;
pub type RemoteTrackHandler = Box<dyn Fn(RemoteTrack) + Send + Sync>;
pub type StateHandler = Box<dyn Fn(PeerState) + Send + Sync>;

/// The negotiation capability the session drives.
///
/// `create_offer` and `create_answer` also install the result as the local
/// description. `apply_remote_description` on an offer while a local offer is
/// pending must roll the local offer back first.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn apply_remote_description(&self, sdp: SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    async fn add_track(&self, track: Arc<dyn TrackLocal + Send + Sync>) -> Result<()>;

    fn on_local_candidate(&self, handler: CandidateHandler);

    fn on_remote_track(&self, handler: RemoteTrackHandler);

    fn on_state_change(&self, handler: StateHandler);

    async fn close(&self) -> Result<()>;
}

/// Builds peer connections for new sessions.
#[async_trait]
pub trait PeerConnector: Send + Sync {
    async fn connect(&self, ice_server: &IceServerConfig) -> Result<Arc<dyn PeerConnection>>;
}
