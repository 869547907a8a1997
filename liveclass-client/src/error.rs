use thiserror::Error;

/// Everything the session façade can report to the presentation layer.
///
/// Payloads are plain strings so the error can be fanned out to several
/// observers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Relay unreachable or dropped. Terminal for the session.
    #[error("relay connection failed: {0}")]
    Connection(String),

    /// Capture permission denied or device missing. `join` may be retried.
    #[error("media access failed: {0}")]
    MediaAccess(String),

    /// Description rejected or peer transport failed. Terminal.
    #[error("negotiation failed: {0}")]
    Negotiation(String),

    /// Malformed or out-of-order signaling message. Dropped.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Operation not allowed in the current phase.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// `join` interrupted by `hangup`.
    #[error("join cancelled by hangup")]
    Cancelled,
}

impl SessionError {
    /// The bare cause, without the category prefix of `Display`.
    pub fn reason(&self) -> String {
        match self {
            SessionError::Connection(reason)
            | SessionError::MediaAccess(reason)
            | SessionError::Negotiation(reason)
            | SessionError::ProtocolViolation(reason)
            | SessionError::InvalidState(reason) => reason.clone(),
            SessionError::Cancelled => self.to_string(),
        }
    }
}

pub type Result<T, E = SessionError> = std::result::Result<T, E>;
