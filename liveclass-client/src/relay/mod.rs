mod local_relay;
mod relay_transport;
mod ws_relay;

pub use local_relay::LocalRelay;
pub use relay_transport::{ChannelEvent, ChannelHandler, RelayChannel, RelayTransport};
pub use ws_relay::{WsChannel, WsRelay};

pub(crate) use relay_transport::Dispatcher;
