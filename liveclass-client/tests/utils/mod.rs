pub mod gated_devices;

pub use gated_devices::GatedDevices;
pub use mock_peer::{MockPeer, MockPeerConnector, PeerOp};
