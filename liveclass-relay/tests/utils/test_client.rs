use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use liveclass_core::{ClientEvent, PeerId, RelayEvent, RoomId};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Raw WebSocket client speaking the relay envelope.
pub struct TestClient {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    pub async fn connect(url: &str) -> Self {
        let (socket, _) = connect_async(url)
            .await
            .expect("Failed to connect to test relay");
        Self { socket }
    }

    pub async fn send_event(&mut self, event: &ClientEvent) {
        let json = serde_json::to_string(event).expect("Failed to encode event");
        self.send_text(&json).await;
    }

    pub async fn send_text(&mut self, text: &str) {
        self.socket
            .send(Message::Text(text.into()))
            .await
            .expect("Failed to send frame");
    }

    /// Joins `room` and returns the id the relay acknowledged.
    pub async fn join(&mut self, room: &str, peer_id: Option<PeerId>) -> PeerId {
        self.send_event(&ClientEvent::Join {
            room_id: RoomId::from(room),
            peer_id,
        })
        .await;

        match self.recv().await {
            Some(RelayEvent::Joined { peer_id, .. }) => peer_id,
            other => panic!("Expected joined ack, got {:?}", other),
        }
    }

    pub async fn signal(&mut self, room: &str, payload: Value) {
        self.send_event(&ClientEvent::Signal {
            room_id: RoomId::from(room),
            payload,
        })
        .await;
    }

    /// Next relay event, or `None` on timeout or close.
    pub async fn recv(&mut self) -> Option<RelayEvent> {
        self.recv_within(RECV_TIMEOUT).await
    }

    pub async fn recv_within(&mut self, wait: Duration) -> Option<RelayEvent> {
        loop {
            let frame = tokio::time::timeout(wait, self.socket.next()).await.ok()??;
            match frame {
                Ok(Message::Text(text)) => {
                    return Some(
                        serde_json::from_str(text.as_str()).expect("Relay sent an unknown event"),
                    );
                }
                Ok(Message::Close(_)) | Err(_) => return None,
                Ok(_) => continue,
            }
        }
    }

    /// Asserts that nothing arrives for a short while.
    pub async fn expect_silence(&mut self) {
        if let Some(event) = self.recv_within(Duration::from_millis(200)).await {
            panic!("Expected no event, got {:?}", event);
        }
    }

    pub async fn close(mut self) {
        let _ = self.socket.close(None).await;
    }
}
