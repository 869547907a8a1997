mod machine;
mod phase;
mod session_state;
mod transition;

pub use machine::NegotiationMachine;
pub use phase::{Phase, Status};
pub use session_state::SessionState;
pub use transition::{Effect, Input, Transition};
