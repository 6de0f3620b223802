//! WebSocket transport for the snapshot subscription interface.
//!
//! Each connection is one broadcaster subscription: the latest snapshot on
//! connect (if any), then every published snapshot as JSON until either
//! side goes away.

use std::net::SocketAddr;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::IntoResponse;
use futures_util::{sink::SinkExt, stream::StreamExt};
use tracing::{debug, error, info};

use super::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> impl IntoResponse {
    info!(target: "netmood::api", "websocket connection from {}", addr);
    ws.on_upgrade(move |socket| handle_socket(socket, state, addr))
}

async fn handle_socket(socket: WebSocket, state: AppState, addr: SocketAddr) {
    let (mut sender, mut receiver) = socket.split();
    let (handle, mut rx) = state.controller.subscribe();

    let mut send_task = tokio::spawn(async move {
        while let Some(snapshot) = rx.recv().await {
            let json = match serde_json::to_string(&*snapshot) {
                Ok(json) => json,
                Err(e) => {
                    error!(target: "netmood::api", "failed to serialize snapshot: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    debug!(target: "netmood::api", "client message: {}", text.trim());
                }
                Message::Close(_) => break,
                // axum answers pings automatically
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    state.controller.unsubscribe(&handle);
    info!(target: "netmood::api", "websocket disconnected: {}", addr);
}
