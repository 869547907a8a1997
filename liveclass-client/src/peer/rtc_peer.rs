use async_trait::async_trait;
use liveclass_core::{IceCandidate, IceServerConfig, SdpType, SessionDescription};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{API, APIBuilder};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

use super::peer_connection::{
    CandidateHandler, PeerConnection, PeerConnector, PeerState, RemoteTrack, RemoteTrackHandler,
    StateHandler,
};
use crate::error::{Result, SessionError};
use crate::media::TrackKind;

/// Builds [`RtcPeer`]s backed by webrtc-rs.
#[derive(Debug, Default, Clone)]
pub struct RtcConnector;

impl RtcConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PeerConnector for RtcConnector {
    async fn connect(&self, ice_server: &IceServerConfig) -> Result<Arc<dyn PeerConnection>> {
        let peer = RtcPeer::new(ice_server).await?;
        Ok(Arc::new(peer))
    }
}

#[derive(Default)]
struct Handlers {
    candidate: Mutex<Option<Arc<dyn Fn(IceCandidate) + Send + Sync>>>,
    track: Mutex<Option<Arc<dyn Fn(RemoteTrack) + Send + Sync>>>,
    state: Mutex<Option<Arc<dyn Fn(PeerState) + Send + Sync>>>,
}

/// Peer connection over webrtc-rs.
///
/// webrtc-rs cannot roll a pending local offer back, so a remote offer that
/// arrives in `have-local-offer` replaces the underlying connection with a
/// fresh one carrying the same tracks and handlers. Callbacks of a replaced
/// connection are muted.
pub struct RtcPeer {
    api: API,
    config: RTCConfiguration,
    inner: RwLock<Arc<RTCPeerConnection>>,
    tracks: Mutex<Vec<Arc<dyn TrackLocal + Send + Sync>>>,
    handlers: Arc<Handlers>,
    epoch: Arc<AtomicU64>,
}

fn negotiation(err: impl std::fmt::Display) -> SessionError {
    SessionError::Negotiation(err.to_string())
}

impl RtcPeer {
    pub async fn new(ice_server: &IceServerConfig) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs().map_err(negotiation)?;
        let registry = register_default_interceptors(Registry::new(), &mut m).map_err(negotiation)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        // No URLs means host candidates only.
        let ice_servers = if ice_server.urls.is_empty() {
            vec![]
        } else {
            vec![RTCIceServer {
                urls: ice_server.urls.clone(),
                username: ice_server.username.clone().unwrap_or_default(),
                credential: ice_server.credential.clone().unwrap_or_default(),
                ..Default::default()
            }]
        };
        let config = RTCConfiguration {
            ice_servers,
            ..Default::default()
        };

        let handlers = Arc::new(Handlers::default());
        let epoch = Arc::new(AtomicU64::new(0));
        let pc = Self::open(&api, &config, &handlers, &epoch).await?;

        Ok(Self {
            api,
            config,
            inner: RwLock::new(pc),
            tracks: Mutex::new(Vec::new()),
            handlers,
            epoch,
        })
    }

    async fn current(&self) -> Arc<RTCPeerConnection> {
        self.inner.read().await.clone()
    }

    async fn open(
        api: &API,
        config: &RTCConfiguration,
        handlers: &Arc<Handlers>,
        epoch: &Arc<AtomicU64>,
    ) -> Result<Arc<RTCPeerConnection>> {
        let pc = Arc::new(
            api.new_peer_connection(config.clone())
                .await
                .map_err(negotiation)?,
        );
        let tag = epoch.fetch_add(1, Ordering::SeqCst) + 1;

        let (h, e, weak) = (handlers.clone(), epoch.clone(), Arc::downgrade(&pc));
        pc.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let (handlers, epoch, weak) = (h.clone(), e.clone(), weak.clone());
            Box::pin(async move {
                if epoch.load(Ordering::SeqCst) != tag {
                    return;
                }
                let Some(candidate) = c else { return };
                let mut init = match candidate.to_json() {
                    Ok(init) => init,
                    Err(e) => {
                        warn!("Failed to serialize local candidate: {}", e);
                        return;
                    }
                };
                // Lets the remote side tell these apart from candidates of a
                // connection replaced during glare.
                if init.username_fragment.is_none() {
                    if let Some(pc) = weak.upgrade() {
                        init.username_fragment = local_ufrag(&pc).await;
                    }
                }
                let handler = handlers.candidate.lock().clone();
                if let Some(handler) = handler {
                    handler(from_init(init));
                }
            })
        }));

        let (h, e) = (handlers.clone(), epoch.clone());
        pc.on_track(Box::new(
            move |track: Arc<TrackRemote>, _: Arc<RTCRtpReceiver>, _: Arc<RTCRtpTransceiver>| {
                let (handlers, epoch) = (h.clone(), e.clone());
                Box::pin(async move {
                    if epoch.load(Ordering::SeqCst) != tag {
                        return;
                    }
                    let kind = match track.kind() {
                        RTPCodecType::Audio => TrackKind::Audio,
                        RTPCodecType::Video => TrackKind::Video,
                        _ => return,
                    };
                    let remote = RemoteTrack {
                        stream_id: track.stream_id(),
                        track_id: track.id(),
                        kind,
                    };
                    info!("Remote {} track {} arrived", remote.kind, remote.track_id);

                    let handler = handlers.track.lock().clone();
                    if let Some(handler) = handler {
                        handler(remote);
                    }

                    // Drain RTP so the receive buffers never fill up.
                    tokio::spawn(async move { while track.read_rtp().await.is_ok() {} });
                })
            },
        ));

        let (h, e) = (handlers.clone(), epoch.clone());
        pc.on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
            let (handlers, epoch) = (h.clone(), e.clone());
            Box::pin(async move {
                if epoch.load(Ordering::SeqCst) != tag {
                    return;
                }
                debug!("Peer connection state changed: {:?}", s);
                let state = match s {
                    RTCPeerConnectionState::New | RTCPeerConnectionState::Unspecified => {
                        PeerState::New
                    }
                    RTCPeerConnectionState::Connecting => PeerState::Connecting,
                    RTCPeerConnectionState::Connected => PeerState::Connected,
                    RTCPeerConnectionState::Disconnected => PeerState::Disconnected,
                    RTCPeerConnectionState::Failed => PeerState::Failed,
                    RTCPeerConnectionState::Closed => PeerState::Closed,
                };
                let handler = handlers.state.lock().clone();
                if let Some(handler) = handler {
                    handler(state);
                }
            })
        }));

        Ok(pc)
    }

    async fn attach(pc: &RTCPeerConnection, track: Arc<dyn TrackLocal + Send + Sync>) -> Result<()> {
        let sender = pc.add_track(track).await.map_err(negotiation)?;

        // RTCP has to be read for interceptors like NACK to work.
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while sender.read(&mut buf).await.is_ok() {}
        });
        Ok(())
    }

    /// Swaps in a fresh connection in place of one holding a local offer.
    async fn replace_connection(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        let fresh = Self::open(&self.api, &self.config, &self.handlers, &self.epoch).await?;

        let tracks = self.tracks.lock().clone();
        for track in tracks {
            Self::attach(&fresh, track).await?;
        }

        let stale = std::mem::replace(&mut *inner, fresh);
        if let Err(e) = stale.close().await {
            warn!("Failed to close replaced peer connection: {}", e);
        }
        info!("Dropped pending local offer in favour of the remote one");
        Ok(())
    }
}

async fn local_ufrag(pc: &RTCPeerConnection) -> Option<String> {
    let local = pc.local_description().await?;
    SessionDescription::offer(local.sdp)
        .ice_ufrag()
        .map(str::to_owned)
}

fn from_init(init: RTCIceCandidateInit) -> IceCandidate {
    IceCandidate {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_m_line_index: init.sdp_mline_index,
        username_fragment: init.username_fragment,
    }
}

fn to_init(candidate: IceCandidate) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: candidate.candidate,
        sdp_mid: candidate.sdp_mid,
        sdp_mline_index: candidate.sdp_m_line_index,
        username_fragment: candidate.username_fragment,
    }
}

fn to_rtc(sdp: SessionDescription) -> Result<RTCSessionDescription> {
    let desc = match sdp.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(sdp.sdp),
        SdpType::Answer => RTCSessionDescription::answer(sdp.sdp),
        SdpType::Pranswer => RTCSessionDescription::pranswer(sdp.sdp),
    };
    desc.map_err(negotiation)
}

#[async_trait]
impl PeerConnection for RtcPeer {
    async fn create_offer(&self) -> Result<SessionDescription> {
        let pc = self.current().await;
        let offer = pc.create_offer(None).await.map_err(negotiation)?;
        pc.set_local_description(offer.clone())
            .await
            .map_err(negotiation)?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let pc = self.current().await;
        let answer = pc.create_answer(None).await.map_err(negotiation)?;
        pc.set_local_description(answer.clone())
            .await
            .map_err(negotiation)?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn apply_remote_description(&self, sdp: SessionDescription) -> Result<()> {
        let is_offer = sdp.sdp_type == SdpType::Offer;
        let desc = to_rtc(sdp)?;

        if is_offer && self.current().await.signaling_state() == RTCSignalingState::HaveLocalOffer {
            self.replace_connection().await?;
        }

        self.current()
            .await
            .set_remote_description(desc)
            .await
            .map_err(negotiation)
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.current()
            .await
            .add_ice_candidate(to_init(candidate))
            .await
            .map_err(negotiation)
    }

    async fn add_track(&self, track: Arc<dyn TrackLocal + Send + Sync>) -> Result<()> {
        let pc = self.current().await;
        self.tracks.lock().push(track.clone());
        Self::attach(&pc, track).await
    }

    fn on_local_candidate(&self, handler: CandidateHandler) {
        *self.handlers.candidate.lock() = Some(Arc::from(handler));
    }

    fn on_remote_track(&self, handler: RemoteTrackHandler) {
        *self.handlers.track.lock() = Some(Arc::from(handler));
    }

    fn on_state_change(&self, handler: StateHandler) {
        *self.handlers.state.lock() = Some(Arc::from(handler));
    }

    async fn close(&self) -> Result<()> {
        self.current().await.close().await.map_err(negotiation)
    }
}
