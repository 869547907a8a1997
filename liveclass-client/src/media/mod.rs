mod media_devices;
mod media_manager;
mod synthetic_devices;

pub use media_devices::{CaptureDevice, MediaConstraints, MediaDevices, TrackKind};
pub use media_manager::{LocalMediaHandle, MediaSessionManager};
pub use synthetic_devices::SyntheticDevices;
