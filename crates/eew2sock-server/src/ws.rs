//! `WebSocket` handler serving registry snapshots on request.
//!
//! Each connection is handled by its own task. The handler never pushes on
//! its own initiative: every inbound text frame is a poll, answered with
//! exactly one binary snapshot packet, except frames starting with the
//! [`HANDSHAKE_PREFIX`], which are liveness probes and get no reply.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use eew2sock_core::protocol::encode_snapshot;
use eew2sock_core::registry::EventRegistry;
use tracing::{debug, info};

use crate::state::AppState;

/// Text frames starting with this prefix are handshakes and get no reply.
pub const HANDSHAKE_PREFIX: &str = "Hello";

/// Upgrade an HTTP request to a `WebSocket` connection and begin serving
/// snapshot requests.
pub async fn ws_events(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state, peer))
}

/// Build the reply to one inbound text frame.
///
/// Returns `None` for a handshake, otherwise the encoded snapshot. The
/// registry lock is released before encoding.
pub async fn reply_to_text(registry: &EventRegistry, text: &str) -> Option<Vec<u8>> {
    if text.starts_with(HANDSHAKE_PREFIX) {
        return None;
    }
    let snapshot = registry.snapshot().await;
    Some(encode_snapshot(&snapshot))
}

/// Handle the `WebSocket` lifecycle: register the connection, answer polls
/// until the client goes away, then release the connection slot.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>, peer: SocketAddr) {
    let guard = state.connections.register(peer);
    let connection_id = guard.id();
    info!(
        %connection_id,
        %peer,
        live = state.connections.len(),
        "WebSocket client connected"
    );

    while let Some(msg) = socket.recv().await {
        match msg {
            Ok(Message::Text(text)) => {
                let Some(packet) = reply_to_text(&state.registry, text.as_str()).await else {
                    debug!(%connection_id, "Handshake received");
                    continue;
                };
                if socket.send(Message::Binary(packet.into())).await.is_err() {
                    debug!(%connection_id, "WebSocket client disconnected (send failed)");
                    break;
                }
            }
            Ok(Message::Ping(data)) => {
                if socket.send(Message::Pong(data)).await.is_err() {
                    debug!(%connection_id, "WebSocket client disconnected (pong failed)");
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {
                // Binary and pong frames from clients carry no request.
            }
            Err(e) => {
                debug!(%connection_id, "WebSocket error: {e}");
                break;
            }
        }
    }

    drop(guard);
    info!(
        %connection_id,
        %peer,
        live = state.connections.len(),
        "WebSocket client disconnected"
    );
}
