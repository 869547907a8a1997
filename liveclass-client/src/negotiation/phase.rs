use serde::Serialize;
use std::fmt;

/// Negotiation lifecycle of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Idle,
    AcquiringMedia,
    Joined,
    /// Local offer requested or sent, awaiting the answer.
    Offering,
    /// Remote offer received, local answer being produced.
    Answering,
    Connected,
    Closed,
}

impl Phase {
    /// Phases in which a session holds resources and `join` is rejected.
    pub fn is_live(self) -> bool {
        !matches!(self, Phase::Idle | Phase::Closed)
    }

    pub fn status(self) -> Status {
        match self {
            Phase::Idle => Status::Idle,
            Phase::AcquiringMedia => Status::Joining,
            Phase::Joined => Status::Joined,
            Phase::Offering | Phase::Answering => Status::Calling,
            Phase::Connected => Status::Connected,
            Phase::Closed => Status::Closed,
        }
    }
}

/// Coarse status exposed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Idle,
    Joining,
    Joined,
    Calling,
    Connected,
    Closed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Idle => "idle",
            Status::Joining => "joining",
            Status::Joined => "joined",
            Status::Calling => "calling",
            Status::Connected => "connected",
            Status::Closed => "closed",
        };
        f.write_str(s)
    }
}
