use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use crate::error::{Result, SessionError};
use crate::media::{CaptureDevice, MediaConstraints, MediaDevices};
use crate::peer::{PeerConnection, RemoteTrackHandler};

/// Devices opened for one session.
pub struct LocalMediaHandle {
    devices: Vec<Arc<dyn CaptureDevice>>,
    released: AtomicBool,
}

impl LocalMediaHandle {
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    pub fn live_tracks(&self) -> usize {
        self.devices.iter().filter(|d| d.is_live()).count()
    }
}

/// Devices opened by an acquisition that has not returned its handle yet.
#[derive(Default)]
struct Opening {
    devices: Vec<Arc<dyn CaptureDevice>>,
    abandoned: bool,
}

/// Acquires capture, feeds it into the peer connection and tears it down.
pub struct MediaSessionManager {
    devices: Arc<dyn MediaDevices>,
    attached: Mutex<HashSet<String>>,
    opening: Mutex<Opening>,
}

impl MediaSessionManager {
    pub fn new(devices: Arc<dyn MediaDevices>) -> Self {
        Self {
            devices,
            attached: Mutex::new(HashSet::new()),
            opening: Mutex::new(Opening::default()),
        }
    }

    /// Opens every device the constraints ask for. On failure whatever was
    /// already opened is stopped before the error is returned.
    pub async fn acquire_local_media(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<LocalMediaHandle> {
        let kinds = constraints.kinds();
        if kinds.is_empty() {
            return Err(SessionError::MediaAccess("no media kind requested".into()));
        }

        let mut opened: Vec<Arc<dyn CaptureDevice>> = Vec::with_capacity(kinds.len());
        for kind in kinds {
            match self.devices.open(kind).await {
                Ok(device) => {
                    let abandoned = {
                        let mut opening = self.opening.lock();
                        if !opening.abandoned {
                            opening.devices.push(device.clone());
                        }
                        opening.abandoned
                    };
                    if abandoned {
                        device.stop();
                        debug!(id = device.id(), "Capture opened after the acquisition was abandoned");
                        return Err(SessionError::Cancelled);
                    }

                    debug!(id = device.id(), %kind, "Capture device opened");
                    opened.push(device);
                }
                Err(e) => {
                    warn!(%kind, "Capture failed, stopping {} opened device(s): {}", opened.len(), e);
                    self.opening.lock().devices.clear();
                    for device in &opened {
                        device.stop();
                    }
                    return Err(match e {
                        SessionError::MediaAccess(_) => e,
                        other => SessionError::MediaAccess(other.to_string()),
                    });
                }
            }
        }

        let abandoned = {
            let mut opening = self.opening.lock();
            opening.devices.clear();
            opening.abandoned
        };
        if abandoned {
            for device in &opened {
                device.stop();
            }
            return Err(SessionError::Cancelled);
        }

        info!(tracks = opened.len(), "Local media acquired");
        Ok(LocalMediaHandle {
            devices: opened,
            released: AtomicBool::new(false),
        })
    }

    /// Stops the devices of an acquisition still in flight. The acquisition
    /// then fails with `Cancelled` and stops anything it opens later.
    pub fn abandon_acquisition(&self) -> usize {
        let devices = {
            let mut opening = self.opening.lock();
            opening.abandoned = true;
            std::mem::take(&mut opening.devices)
        };
        for device in &devices {
            device.stop();
        }
        if !devices.is_empty() {
            info!(stopped = devices.len(), "Abandoned a partial media acquisition");
        }
        devices.len()
    }

    /// Adds the handle's tracks to `peer`. Tracks already attached are skipped.
    pub async fn attach_tracks(
        &self,
        peer: &dyn PeerConnection,
        handle: &LocalMediaHandle,
    ) -> Result<usize> {
        if handle.is_released() {
            return Err(SessionError::InvalidState("media already released".into()));
        }

        let mut added = 0;
        for device in &handle.devices {
            if !self.attached.lock().insert(device.id().to_owned()) {
                continue;
            }
            if let Err(e) = peer.add_track(device.track()).await {
                self.attached.lock().remove(device.id());
                return Err(e);
            }
            added += 1;
        }

        debug!(added, "Local tracks attached");
        Ok(added)
    }

    pub fn on_remote_track(&self, peer: &dyn PeerConnection, handler: RemoteTrackHandler) {
        peer.on_remote_track(handler);
    }

    /// Stops every device of the handle. Later calls are no-ops.
    pub fn release(&self, handle: &LocalMediaHandle) {
        if handle.released.swap(true, Ordering::SeqCst) {
            return;
        }
        for device in &handle.devices {
            device.stop();
        }
        self.attached.lock().clear();
        info!(tracks = handle.devices.len(), "Local media released");
    }
}
