use liveclass_core::utils::DEFAULT_RELAY_BIND;
use std::net::SocketAddr;

use crate::error::RelayError;

pub const RELAY_BIND_ENV: &str = "LIVECLASS_RELAY_BIND";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    pub bind: SocketAddr,
}

impl RelayConfig {
    pub fn new(bind: &str) -> Result<Self, RelayError> {
        let bind = bind.parse().map_err(|source| RelayError::InvalidBind {
            addr: bind.to_owned(),
            source,
        })?;
        Ok(Self { bind })
    }

    /// `LIVECLASS_RELAY_BIND` if set, otherwise the default port on all
    /// interfaces.
    pub fn from_env() -> Result<Self, RelayError> {
        match std::env::var(RELAY_BIND_ENV) {
            Ok(addr) if !addr.trim().is_empty() => Self::new(addr.trim()),
            _ => Self::new(DEFAULT_RELAY_BIND),
        }
    }
}
