use std::sync::Arc;
use std::time::Duration;

use liveclass_client::{
    MediaConstraints, RtcConnector, Session, SessionConfig, Status, SyntheticDevices, WsRelay,
};
use liveclass_core::IceServerConfig;

use crate::integration::{ROOM, init_tracing};
use crate::utils::TestRelay;

const CONNECT_WAIT: Duration = Duration::from_secs(20);

fn session(url: &str) -> Session {
    let mut config = SessionConfig::default()
        .with_relay_url(url)
        .with_constraints(MediaConstraints::default());
    // Loopback host candidates are enough here.
    config.ice_server = IceServerConfig {
        urls: vec![],
        username: None,
        credential: None,
    };

    Session::new(
        config,
        Arc::new(WsRelay::new()),
        Arc::new(RtcConnector::new()),
        Arc::new(SyntheticDevices::silent()),
    )
}

async fn wait_for(session: &Session, status: Status) -> bool {
    let mut rx = session.status();
    tokio::time::timeout(CONNECT_WAIT, rx.wait_for(|s| *s == status))
        .await
        .map(|r| r.is_ok())
        .unwrap_or(false)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_sessions_connect_through_relay() {
    init_tracing();
    let relay = TestRelay::spawn().await;

    let instructor = session(&relay.url());
    let student = session(&relay.url());

    instructor.join(ROOM).await.expect("instructor join failed");
    student.join(ROOM).await.expect("student join failed");
    assert_eq!(*instructor.status().borrow(), Status::Joined);

    instructor.call().await.expect("call failed");

    assert!(wait_for(&instructor, Status::Connected).await, "instructor never connected");
    assert!(wait_for(&student, Status::Connected).await, "student never connected");

    let mut remote = student.remote_stream();
    let got_stream = tokio::time::timeout(CONNECT_WAIT, remote.wait_for(|s| s.is_some()))
        .await
        .map(|r| r.is_ok())
        .unwrap_or(false);
    assert!(got_stream, "student never saw the instructor's tracks");

    instructor.hangup().await;
    student.hangup().await;
    assert_eq!(*instructor.status().borrow(), Status::Closed);
}
