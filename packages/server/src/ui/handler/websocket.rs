//! WebSocket connection handler.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use tokio::sync::mpsc;

use crate::{
    domain::{ConnectionId, PushFrame},
    ui::{router::EventRouter, state::AppState},
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Spawns the writer task of one connection.
///
/// Frames queued through the MessagePusher are written to the socket in order.
/// A [`PushFrame::Close`] sends a Close frame and ends the task.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<PushFrame>,
    mut sender: SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match frame {
                PushFrame::Text(text) => {
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                PushFrame::Close => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id = ConnectionId::generate();
    let (sender, mut receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel();

    let router = EventRouter::new(state, connection_id);
    router.connect(tx).await;
    tracing::info!("Connection {} opened", connection_id);

    let mut send_task = pusher_loop(rx, sender);

    // イベントの処理は select の外側（分岐の本体）で行い、途中でキャンセルされないようにする
    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => router.dispatch(text.as_str()).await,
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!("Connection {} closed by client", connection_id);
                    break;
                }
                Some(Ok(_)) => {
                    // Ping/Pong は WebSocket 層が処理し、バイナリは扱わない
                }
                Some(Err(e)) => {
                    tracing::warn!("WebSocket error on {}: {}", connection_id, e);
                    break;
                }
            },
            _ = &mut send_task => {
                tracing::info!("Connection {} closed by server", connection_id);
                break;
            }
        }
    }

    router.disconnect().await;
    send_task.abort();
    tracing::info!("Connection {} cleaned up", connection_id);
}
