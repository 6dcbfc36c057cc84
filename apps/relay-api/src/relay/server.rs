//! WebSocket upgrade handler and per-connection event loop.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time;

use crate::AppState;

use super::events::ClientEvent;

/// Outbound writes blocked longer than this are treated as a dead peer.
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct ConnectParams {
    name: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/ws/{user_id}", get(ws_upgrade))
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    Path(user_id): Path<String>,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let name = params
        .name
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("User_{}", user_id.chars().take(8).collect::<String>()));
    ws.on_upgrade(move |socket| handle_connection(socket, state, user_id, name))
}

/// Per-connection loop: register with the relay, then shuttle frames until
/// the peer goes away or the connection is evicted by a reconnect.
async fn handle_connection(socket: WebSocket, state: AppState, user_id: String, name: String) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let conn_id = tether_common::id::prefixed_ulid(tether_common::id::prefix::CONNECTION);

    state.relay.connect(&user_id, &name, &conn_id, tx).await;

    loop {
        tokio::select! {
            // Inbound frame from the client.
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientEvent>(&text) {
                            Ok(event) => state.relay.handle_event(&user_id, event),
                            Err(err) => {
                                // Best-effort protocol: malformed frames are
                                // dropped without penalizing the connection.
                                tracing::debug!(?err, %user_id, "malformed client event dropped");
                            }
                        }
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!(?err, %user_id, "ws read error");
                        break;
                    }
                    _ => continue,
                }
            }

            // Outbound event queued by the router or the presence publisher.
            event = rx.recv() => {
                let Some(event) = event else {
                    // Queue closed: this connection was evicted by a
                    // reconnecting identity. Close silently.
                    break;
                };
                let json = serde_json::to_string(&event).unwrap();
                match time::timeout(SEND_TIMEOUT, ws_tx.send(Message::Text(json.into()))).await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        tracing::debug!(?err, %user_id, "ws write error");
                        break;
                    }
                    Err(_) => {
                        tracing::debug!(%user_id, "ws write timed out");
                        break;
                    }
                }
            }
        }
    }

    // No-op if this connection was already replaced.
    state.relay.disconnect(&user_id, &conn_id).await;
    let _ = ws_tx.send(Message::Close(None)).await;
}
