use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use liveclass_core::{ClientEvent, PeerId, RelayEvent, RoomId, SignalMessage};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message, error::ProtocolError};
use tracing::{debug, info, trace, warn};

use super::relay_transport::{ChannelHandler, Dispatcher, RelayChannel, RelayTransport};
use crate::error::{Result, SessionError};

const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Relay transport over a WebSocket connection.
#[derive(Debug, Default, Clone)]
pub struct WsRelay;

impl WsRelay {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RelayTransport for WsRelay {
    async fn connect(&self, url: &str) -> Result<Arc<dyn RelayChannel>> {
        let channel = WsChannel::open(url).await?;
        Ok(Arc::new(channel))
    }
}

pub struct WsChannel {
    outbound: Mutex<Option<mpsc::UnboundedSender<ClientEvent>>>,
    dispatcher: Arc<Dispatcher>,
    writer: Mutex<Option<JoinHandle<()>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl WsChannel {
    pub async fn open(url: &str) -> Result<Self> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|err| SessionError::Connection(format!("websocket connect failed: {err}")))?;
        info!(url = %url, "relay websocket connected");

        let (mut ws_write, mut ws_read) = ws_stream.split();
        let (send_tx, mut send_rx) = mpsc::unbounded_channel::<ClientEvent>();
        let dispatcher = Arc::new(Dispatcher::new());

        let writer = tokio::spawn(async move {
            while let Some(event) = send_rx.recv().await {
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Failed to encode relay frame: {}", e);
                        continue;
                    }
                };
                if ws_write.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            let _ = ws_write.close().await;
        });

        let reader_dispatcher = dispatcher.clone();
        let reader = tokio::spawn(async move {
            let reason = loop {
                match ws_read.next().await {
                    Some(Ok(Message::Text(text))) => {
                        trace!(len = text.len(), "relay frame in");
                        match serde_json::from_str::<RelayEvent>(text.as_str()) {
                            Ok(event) => reader_dispatcher.deliver(event),
                            Err(e) => warn!("Ignoring unreadable relay frame: {}", e),
                        }
                    }
                    Some(Ok(Message::Close(_))) => break "relay closed the connection".to_string(),
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        match &err {
                            WsError::ConnectionClosed
                            | WsError::AlreadyClosed
                            | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => {
                                debug!("relay websocket closed: {err}");
                            }
                            _ => warn!("relay websocket error: {err}"),
                        }
                        break err.to_string();
                    }
                    None => break "relay connection ended".to_string(),
                }
            };
            reader_dispatcher.disconnect(reason);
        });

        Ok(Self {
            outbound: Mutex::new(Some(send_tx)),
            dispatcher,
            writer: Mutex::new(Some(writer)),
            reader: Mutex::new(Some(reader)),
        })
    }

    fn publish(&self, event: ClientEvent) -> Result<()> {
        let outbound = self.outbound.lock();
        let Some(tx) = outbound.as_ref() else {
            return Err(SessionError::Connection("relay channel closed".into()));
        };
        tx.send(event)
            .map_err(|_| SessionError::Connection("relay writer stopped".into()))
    }
}

#[async_trait]
impl RelayChannel for WsChannel {
    async fn join_room(&self, room: &RoomId, peer: PeerId) -> Result<()> {
        debug!(room = %room, peer = %peer, "joining relay room");
        self.publish(ClientEvent::Join {
            room_id: room.clone(),
            peer_id: Some(peer),
        })
    }

    async fn send(&self, room: &RoomId, message: &SignalMessage) -> Result<()> {
        let event = ClientEvent::signal(room.clone(), message)
            .map_err(|e| SessionError::ProtocolViolation(e.to_string()))?;
        debug!(room = %room, kind = message.kind(), "relay frame out");
        self.publish(event)
    }

    fn on_message(&self, handler: ChannelHandler) {
        self.dispatcher.attach(handler);
    }

    async fn close(&self) {
        self.dispatcher.finish();
        // Dropping the sender lets the writer flush and send a close frame.
        let sender = self.outbound.lock().take();
        drop(sender);

        let writer = self.writer.lock().take();
        if let Some(writer) = writer {
            if tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, writer).await.is_err() {
                debug!("relay writer did not finish in time");
            }
        }
        let reader = self.reader.lock().take();
        if let Some(reader) = reader {
            reader.abort();
        }
    }
}

impl Drop for WsChannel {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.lock().take() {
            writer.abort();
        }
        if let Some(reader) = self.reader.lock().take() {
            reader.abort();
        }
    }
}
