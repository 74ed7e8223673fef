//! WebSocket push channel for the web UI.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info};

use crate::state::AppState;

/// Per-write deadline; a subscriber that cannot take a message within this
/// window is disconnected.
const WRITE_DEADLINE: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// Accepted and ignored; the frontend sends it, sessions are not
    /// isolated.
    #[allow(dead_code)]
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// GET /ws
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(_params): Query<WsParams>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Forward broadcast events to one socket until either side goes away.
///
/// On connect the subscriber is resynchronized with all currently pending
/// requests (replayed as `new_request` events by the broadcaster).
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let pending = state.store.pending().await;
    let mut sub = state.broadcaster.subscribe(pending).await;
    info!(subscriber = sub.id, "ws client connected");

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            event = sub.events.recv() => {
                // Channel closure means the broadcaster dropped us
                // (shutdown or slow-subscriber eviction).
                let Some(event) = event else { break };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        debug!(error = %e, "failed to encode event");
                        continue;
                    }
                };
                match tokio::time::timeout(WRITE_DEADLINE, sender.send(Message::Text(text))).await {
                    Ok(Ok(())) => {}
                    _ => break,
                }
            }
            msg = receiver.next() => {
                // No client-to-server messages are expected; read until
                // close or error.
                match msg {
                    Some(Ok(_)) => continue,
                    _ => break,
                }
            }
        }
    }

    state.broadcaster.unsubscribe(sub.id).await;
    info!(subscriber = sub.id, "ws client disconnected");
}
