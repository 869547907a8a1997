use crate::SignalingService;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use liveclass_core::{ClientEvent, PeerId, RelayEvent, RoomId};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(service): State<SignalingService>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, service))
}

/// Identity and room of one socket, known once it has joined.
#[derive(Default)]
struct Membership {
    peer_id: Option<PeerId>,
    room: Option<RoomId>,
}

fn reply(tx: &mpsc::UnboundedSender<Message>, event: &RelayEvent) {
    if let Ok(json) = serde_json::to_string(event) {
        let _ = tx.send(Message::Text(json.into()));
    }
}

fn reject(tx: &mpsc::UnboundedSender<Message>, message: impl Into<String>) {
    let message = message.into();
    warn!("Rejecting frame: {}", message);
    reply(tx, &RelayEvent::Error { message });
}

async fn handle_socket(socket: WebSocket, service: SignalingService) {
    debug!("New WebSocket connection");

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let membership = Arc::new(Mutex::new(Membership::default()));

    let mut recv_task = tokio::spawn({
        let service = service.clone();
        let membership = membership.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                        Ok(event) => handle_event(&service, &tx, &mut membership.lock(), event),
                        Err(e) => reject(&tx, format!("invalid frame: {e}")),
                    },
                    Message::Binary(_) => reject(&tx, "binary frames are not supported"),
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    let Membership { peer_id, room } = std::mem::take(&mut *membership.lock());
    match peer_id {
        Some(peer_id) => {
            if let Some(room) = room {
                service.leave_room(&room, peer_id);
            }
            service.remove_peer(&peer_id);
            info!("WebSocket disconnected: {}", peer_id);
        }
        None => debug!("WebSocket disconnected before joining"),
    }
}

fn handle_event(
    service: &SignalingService,
    tx: &mpsc::UnboundedSender<Message>,
    membership: &mut Membership,
    event: ClientEvent,
) {
    match event {
        ClientEvent::Join { room_id, peer_id } => {
            let peer_id = match (membership.peer_id, peer_id) {
                (Some(current), Some(asked)) if current != asked => {
                    return reject(tx, "peer id cannot change on a connection");
                }
                (Some(current), _) => current,
                (None, asked) => {
                    let id = asked.unwrap_or_default();
                    if !service.add_peer(id, tx.clone()) {
                        return reject(tx, format!("peer id {id} is already connected"));
                    }
                    membership.peer_id = Some(id);
                    id
                }
            };

            if let Some(previous) = membership.room.take() {
                service.leave_room(&previous, peer_id);
            }
            service.join_room(&room_id, peer_id);
            membership.room = Some(room_id);
        }
        ClientEvent::Signal { room_id, payload } => {
            let Some(peer_id) = membership.peer_id else {
                return reject(tx, "signal before join");
            };
            if !service.is_member(&room_id, peer_id) {
                return reject(tx, format!("not a member of room {room_id}"));
            }
            service.forward_signal(&room_id, peer_id, payload);
        }
        ClientEvent::Leave { room_id } => {
            let Some(peer_id) = membership.peer_id else {
                return reject(tx, "leave before join");
            };
            if membership.room.as_ref() == Some(&room_id) {
                membership.room = None;
                service.leave_room(&room_id, peer_id);
            }
        }
    }
}
