use std::net::{AddrParseError, SocketAddr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid bind address {addr:?}")]
    InvalidBind {
        addr: String,
        #[source]
        source: AddrParseError,
    },

    #[error("failed to bind {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("relay server failed")]
    Serve(#[source] std::io::Error),
}
