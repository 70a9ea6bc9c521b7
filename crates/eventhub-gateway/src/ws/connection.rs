use axum::{
    extract::{ws::Message, ws::WebSocket, State, WebSocketUpgrade},
    response::IntoResponse,
};
use eventhub_core::config::{MAX_WS_FRAME_BYTES, WS_OUTBOUND_BUFFER};
use eventhub_core::types::ConnId;
use eventhub_protocol::ConnectedFrame;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::app::AppState;
use crate::ws::registry::ClientRegistry;

/// Axum handler: upgrades HTTP to WebSocket at GET /ws.
///
/// The channel is unauthenticated; every connection receives every envelope.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let registry = Arc::clone(&state.registry);
    ws.max_message_size(MAX_WS_FRAME_BYTES)
        .on_upgrade(move |socket| run_connection(socket, registry))
}

/// Per-connection loop: greet, register, then pump queued envelopes out and
/// drain inbound frames until either side goes away.
async fn run_connection(socket: WebSocket, registry: Arc<ClientRegistry>) {
    let conn_id = ConnId::new();
    info!(conn_id = %conn_id, "new WS connection");

    let (mut tx, mut rx) = socket.split();

    let hello = match serde_json::to_string(&ConnectedFrame::default()) {
        Ok(json) => json,
        Err(e) => {
            warn!(conn_id = %conn_id, error = %e, "failed to encode hello frame");
            return;
        }
    };
    if tx.send(Message::Text(hello.into())).await.is_err() {
        return;
    }

    let (out_tx, mut out_rx) = mpsc::channel::<Arc<str>>(WS_OUTBOUND_BUFFER);
    registry.register(conn_id.clone(), out_tx);

    loop {
        tokio::select! {
            msg = rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if text.len() > MAX_WS_FRAME_BYTES {
                            warn!(conn_id = %conn_id, size = text.len(), "payload too large");
                            break;
                        }
                        // inbound frames carry no commands yet
                        debug!(conn_id = %conn_id, size = text.len(), "inbound frame ignored");
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if tx.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(conn_id = %conn_id, error = %e, "ws read error");
                        break;
                    }
                    _ => {}
                }
            }

            out = out_rx.recv() => {
                match out {
                    Some(text) => {
                        if tx.send(Message::Text(text.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                    // evicted or registry closed
                    None => {
                        let _ = tx.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        }
    }

    registry.unregister(&conn_id);
    info!(conn_id = %conn_id, "WS connection closed");
}
