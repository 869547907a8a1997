use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

use crate::error::{Result, SessionError};
use crate::media::{CaptureDevice, MediaDevices, TrackKind};

const LOCAL_STREAM_ID: &str = "liveclass-local";

/// Opus silence frame.
const SILENCE_FRAME: &[u8] = &[0xf8, 0xff, 0xfe];
/// Placeholder payload; receivers only need RTP to flow.
const BLANK_FRAME: &[u8] = &[0x10, 0x02, 0x00, 0x9d, 0x01, 0x2a];

/// Capture devices that exist only in memory.
///
/// Each device owns a real `webrtc` sample track fed by a pump task so the
/// remote side sees RTP arrive. Counters are shared between clones.
#[derive(Clone)]
pub struct SyntheticDevices {
    denied: Arc<Mutex<HashSet<TrackKind>>>,
    live: Arc<AtomicUsize>,
    opened: Arc<AtomicUsize>,
    pump: bool,
}

impl Default for SyntheticDevices {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticDevices {
    pub fn new() -> Self {
        Self {
            denied: Arc::new(Mutex::new(HashSet::new())),
            live: Arc::new(AtomicUsize::new(0)),
            opened: Arc::new(AtomicUsize::new(0)),
            pump: true,
        }
    }

    /// Devices that never write samples.
    pub fn silent() -> Self {
        Self {
            pump: false,
            ..Self::new()
        }
    }

    /// Makes opening `kind` fail as if the user refused permission.
    pub fn deny(&self, kind: TrackKind) {
        self.denied.lock().insert(kind);
    }

    pub fn allow(&self, kind: TrackKind) {
        self.denied.lock().remove(&kind);
    }

    /// Devices currently capturing.
    pub fn live_captures(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Devices opened since creation.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaDevices for SyntheticDevices {
    async fn open(&self, kind: TrackKind) -> Result<Arc<dyn CaptureDevice>> {
        if self.denied.lock().contains(&kind) {
            return Err(SessionError::MediaAccess(format!("{kind} permission denied")));
        }

        let n = self.opened.fetch_add(1, Ordering::SeqCst);
        let id = format!("{kind}-{n}");
        let mime_type = match kind {
            TrackKind::Audio => MIME_TYPE_OPUS,
            TrackKind::Video => MIME_TYPE_VP8,
        };
        let track = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: mime_type.to_owned(),
                ..Default::default()
            },
            id.clone(),
            LOCAL_STREAM_ID.to_owned(),
        ));

        let pump = self.pump.then(|| spawn_pump(kind, track.clone()));
        self.live.fetch_add(1, Ordering::SeqCst);

        Ok(Arc::new(SyntheticCapture {
            id,
            kind,
            track,
            live: AtomicBool::new(true),
            live_count: self.live.clone(),
            pump: Mutex::new(pump),
        }))
    }
}

struct SyntheticCapture {
    id: String,
    kind: TrackKind,
    track: Arc<TrackLocalStaticSample>,
    live: AtomicBool,
    live_count: Arc<AtomicUsize>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl CaptureDevice for SyntheticCapture {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn track(&self) -> Arc<dyn TrackLocal + Send + Sync> {
        self.track.clone()
    }

    fn stop(&self) {
        if !self.live.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(pump) = self.pump.lock().take() {
            pump.abort();
        }
        self.live_count.fetch_sub(1, Ordering::SeqCst);
        debug!(id = %self.id, "Synthetic capture stopped");
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

impl Drop for SyntheticCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_pump(kind: TrackKind, track: Arc<TrackLocalStaticSample>) -> JoinHandle<()> {
    let (frame, interval) = match kind {
        TrackKind::Audio => (SILENCE_FRAME, Duration::from_millis(20)),
        TrackKind::Video => (BLANK_FRAME, Duration::from_millis(33)),
    };

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let sample = Sample {
                data: Bytes::from_static(frame),
                duration: interval,
                ..Default::default()
            };
            if let Err(e) = track.write_sample(&sample).await {
                debug!("Synthetic pump stopped: {}", e);
                break;
            }
        }
    })
}
