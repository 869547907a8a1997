use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use liveclass_relay::{SignalingService, serve_on};

/// A relay serving on an ephemeral local port for the duration of a test.
pub struct TestRelay {
    pub addr: SocketAddr,
    pub service: SignalingService,
    task: JoinHandle<()>,
}

impl TestRelay {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("No local address");
        let service = SignalingService::new();

        let task = tokio::spawn({
            let service = service.clone();
            async move {
                if let Err(e) = serve_on(listener, service).await {
                    tracing::error!("Test relay stopped: {}", e);
                }
            }
        });

        Self {
            addr,
            service,
            task,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        self.task.abort();
    }
}
