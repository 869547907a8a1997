//! Integration tests for liveclass-relay.
//!
//! - `room_tests` - join acks, membership notices and room lifetime
//! - `signal_tests` - forwarding and rejected frames
//! - `session_tests` - two client sessions negotiating through the relay

pub mod room_tests;
pub mod session_tests;

use tracing::Level;

pub const ROOM: &str = "class-1";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Polls `check` until it holds or a second has passed.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    check()
}
