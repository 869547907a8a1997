use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use webrtc::track::track_local::TrackLocal;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Audio => f.write_str("audio"),
            TrackKind::Video => f.write_str("video"),
        }
    }
}

/// Which devices `join` asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

impl MediaConstraints {
    pub fn kinds(&self) -> Vec<TrackKind> {
        let mut kinds = Vec::with_capacity(2);
        if self.audio {
            kinds.push(TrackKind::Audio);
        }
        if self.video {
            kinds.push(TrackKind::Video);
        }
        kinds
    }
}

/// One open capture source and the local track it feeds.
pub trait CaptureDevice: Send + Sync {
    fn id(&self) -> &str;

    fn kind(&self) -> TrackKind;

    fn track(&self) -> Arc<dyn TrackLocal + Send + Sync>;

    /// Stops capturing. Must tolerate repeated calls.
    fn stop(&self);

    fn is_live(&self) -> bool;
}

/// Access to the platform's capture devices.
///
/// `open` may be dropped mid-flight when the session hangs up, so
/// implementations must not leave a device running if the future is
/// cancelled before it resolves.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn open(&self, kind: TrackKind) -> Result<Arc<dyn CaptureDevice>>;
}
