use async_trait::async_trait;
use liveclass_client::SessionError;
use liveclass_client::media::{CaptureDevice, MediaDevices, SyntheticDevices, TrackKind};
use std::sync::Arc;
use tokio::sync::watch;

/// Synthetic devices whose `open` blocks until the gate is opened, like a
/// permission prompt the user has not answered yet. Only the gated kinds wait.
#[derive(Clone)]
pub struct GatedDevices {
    inner: SyntheticDevices,
    gate: Arc<watch::Sender<bool>>,
    gated: Vec<TrackKind>,
}

impl GatedDevices {
    pub fn new(inner: SyntheticDevices) -> Self {
        Self::gating(inner, vec![TrackKind::Audio, TrackKind::Video])
    }

    /// Audio opens at once; only the camera prompt is pending.
    pub fn video_only(inner: SyntheticDevices) -> Self {
        Self::gating(inner, vec![TrackKind::Video])
    }

    fn gating(inner: SyntheticDevices, gated: Vec<TrackKind>) -> Self {
        let (gate, _) = watch::channel(false);
        Self {
            inner,
            gate: Arc::new(gate),
            gated,
        }
    }

    /// Lets every pending and future `open` through.
    pub fn open_gate(&self) {
        self.gate.send_replace(true);
    }
}

#[async_trait]
impl MediaDevices for GatedDevices {
    async fn open(&self, kind: TrackKind) -> Result<Arc<dyn CaptureDevice>, SessionError> {
        if self.gated.contains(&kind) {
            let mut gate = self.gate.subscribe();
            gate.wait_for(|open| *open)
                .await
                .map_err(|_| SessionError::MediaAccess("gate dropped".into()))?;
        }
        self.inner.open(kind).await
    }
}
