//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::{
    sync::{Mutex, mpsc, watch},
    time::Instant,
};

use crate::{
    config::HeartbeatConfig,
    domain::{Room, User},
    ui::{session::ChatSession, state::AppState},
    usecase::ConnectError,
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub room: String,
    pub token: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    // 認証とルームのアクセス判定は upgrade 前に行う
    let (user, room) = match state
        .connect_participant_usecase
        .authorize(query.token.as_deref(), &query.room)
        .await
    {
        Ok(authorized) => authorized,
        Err(ConnectError::Unauthenticated) => {
            tracing::warn!("Rejected unauthenticated connection to '{}'", query.room);
            return Err(StatusCode::UNAUTHORIZED);
        }
        Err(ConnectError::InvalidRoom(reason)) => {
            tracing::warn!("Rejected connection: {}", reason);
            return Err(StatusCode::BAD_REQUEST);
        }
        Err(ConnectError::AccessDenied) => return Err(StatusCode::FORBIDDEN),
        Err(ConnectError::Store(e)) => {
            tracing::error!("Store failure while connecting: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, room, user)))
}

/// Spawns a task that drains the connection's channel into the WebSocket and
/// keeps the transport alive.
///
/// Every `interval` a Ping is sent; when nothing has been received for
/// `timeout` the task ends, which the caller treats as a disconnect.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
    heartbeat: HeartbeatConfig,
    last_seen: watch::Receiver<Instant>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(heartbeat.interval);
        ticker.reset();
        loop {
            tokio::select! {
                outbound = rx.recv() => {
                    let Some(text) = outbound else { break };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let silent_for = last_seen.borrow().elapsed();
                    if silent_for > heartbeat.timeout {
                        tracing::warn!(
                            "No frame for {:?}; treating connection as lost",
                            silent_for
                        );
                        break;
                    }
                    if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = sender.close().await;
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, room: Room, user: User) {
    let (sender, mut receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel();
    let (seen_tx, seen_rx) = watch::channel(Instant::now());

    // Spawn the outbound task first so join-time frames are flushed immediately
    let mut send_task = pusher_loop(rx, sender, state.heartbeat, seen_rx);

    let session = Arc::new(Mutex::new(ChatSession::new(state, room, user)));
    let connection_id = {
        let mut session = session.lock().await;
        session.join(tx).await;
        session.connection_id()
    };

    // Frames from one connection are dispatched in arrival order
    let session_for_recv = session.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!("WebSocket error on {}: {}", connection_id, e);
                    break;
                }
            };
            seen_tx.send_replace(Instant::now());

            match frame {
                Message::Text(text) => {
                    session_for_recv
                        .lock()
                        .await
                        .handle_text(text.as_str())
                        .await
                }
                Message::Close(_) => {
                    tracing::info!("Connection {} requested close", connection_id);
                    break;
                }
                // Ping/pong is handled by the WebSocket protocol
                _ => {}
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    session.lock().await.close().await;
    tracing::info!("Connection {} closed", connection_id);
}
