//! Per-connection socket pumps.

use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use wsgate_core::frames::Reply;

use crate::forwarder::{extract_reply, EventForwarder};
use crate::registry::{Connection, ConnectionRegistry};

/// Run the reader/writer pumps for an accepted socket until it closes, then
/// unregister the connection and notify the disconnect handler.
///
/// State per connection: Connecting -> Open on entry (registration and the
/// ack already happened), Open for the pumps' lifetime, Closed after the
/// registry entry is removed.
pub async fn run(
    socket: WebSocket,
    conn: Arc<Connection>,
    mut rx: mpsc::Receiver<String>,
    registry: Arc<ConnectionRegistry>,
    forwarder: Arc<EventForwarder>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let id = conn.id.clone();

    // Writer: drain queued frames into the socket.
    let writer = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Reader: forward each inbound text frame and relay a synchronous reply
    // when the handler's payload carries one. The next frame is not read
    // until the forward completes, keeping events FIFO per connection.
    let reader_id = id.clone();
    let reader_conn = Arc::clone(&conn);
    let reader_forwarder = Arc::clone(&forwarder);
    let reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                WsMessage::Text(text) => {
                    let body = text.to_string();
                    tracing::info!(
                        connection_id = %reader_id,
                        len = body.len(),
                        "inbound message"
                    );
                    let event = reader_forwarder.message_event(&reader_id, &body);
                    match reader_forwarder.forward(event).await {
                        Ok(output) => {
                            if let Some(reply) = extract_reply(&output) {
                                if let Ok(json) = serde_json::to_string(&Reply { reply }) {
                                    let _ = reader_conn.enqueue(json);
                                }
                            }
                        }
                        Err(e) => {
                            tracing::error!(
                                connection_id = %reader_id,
                                error = %e,
                                kind = e.error_kind(),
                                "message handler failed"
                            );
                        }
                    }
                }
                WsMessage::Close(_) => break,
                // axum answers pings itself; other frame kinds are ignored.
                _ => {}
            }
        }
    });

    // Either pump ending means the connection is done.
    tokio::select! {
        _ = writer => {}
        _ = reader => {}
    }

    registry.remove(&id);
    tracing::info!(connection_id = %id, "client disconnected");

    // Best-effort disconnect notification; failure is swallowed and the
    // entry stays removed either way.
    if let Err(e) = forwarder.forward(forwarder.disconnect_event(&id)).await {
        tracing::debug!(connection_id = %id, error = %e, "disconnect handler failed");
    }
}
