use liveclass_core::IceServerConfig;
use liveclass_core::utils::{DEFAULT_RELAY_URL, DEFAULT_STUN_ADDR};

use crate::media::MediaConstraints;

pub const SIGNALING_URL_ENV: &str = "LIVECLASS_SIGNALING_URL";
pub const STUN_URL_ENV: &str = "LIVECLASS_STUN_URL";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub relay_url: String,
    /// The single STUN server handed to the peer connection.
    pub ice_server: IceServerConfig,
    pub constraints: MediaConstraints,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            relay_url: DEFAULT_RELAY_URL.to_owned(),
            ice_server: IceServerConfig::stun(DEFAULT_STUN_ADDR),
            constraints: MediaConstraints::default(),
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by `LIVECLASS_SIGNALING_URL` and `LIVECLASS_STUN_URL`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(url) = non_empty_env(SIGNALING_URL_ENV) {
            config.relay_url = url;
        }
        if let Some(url) = non_empty_env(STUN_URL_ENV) {
            config.ice_server = IceServerConfig::stun(url);
        }
        config
    }

    pub fn with_relay_url(mut self, url: impl Into<String>) -> Self {
        self.relay_url = url.into();
        self
    }

    pub fn with_constraints(mut self, constraints: MediaConstraints) -> Self {
        self.constraints = constraints;
        self
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
