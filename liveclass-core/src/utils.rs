/// Public STUN server used when no other ICE server is configured.
pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";

/// Relay endpoint the client dials when nothing else is configured.
pub const DEFAULT_RELAY_URL: &str = "ws://localhost:5179/ws";

/// Address the relay binds to by default.
pub const DEFAULT_RELAY_BIND: &str = "0.0.0.0:5179";
