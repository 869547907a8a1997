//! Room relay: forwards signaling frames between the members of a room.

mod config;
mod error;
mod room;
mod signaling;

pub use config::*;
pub use error::*;
pub use room::*;
pub use signaling::*;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tracing::info;

/// The relay's HTTP surface: a single WebSocket endpoint at `/ws`.
pub fn router(service: SignalingService) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(service)
}

/// Binds `config.bind` and serves the relay until the listener fails.
pub async fn serve(config: RelayConfig) -> Result<(), RelayError> {
    let listener = TcpListener::bind(config.bind)
        .await
        .map_err(|source| RelayError::Bind {
            addr: config.bind,
            source,
        })?;
    serve_on(listener, SignalingService::new()).await
}

/// Serves the relay on an already bound listener.
pub async fn serve_on(listener: TcpListener, service: SignalingService) -> Result<(), RelayError> {
    let addr = listener.local_addr().map_err(RelayError::Serve)?;
    info!("Relay listening on ws://{}/ws", addr);

    axum::serve(listener, router(service))
        .await
        .map_err(RelayError::Serve)
}
