pub use liveclass_core::model::{PeerId, RoomId};

pub mod model {
    pub use liveclass_core::model::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use liveclass_client::*;
}

#[cfg(feature = "relay")]
pub mod relay {
    pub use liveclass_relay::*;
}
