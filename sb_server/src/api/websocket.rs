//! WebSocket handler for real-time table updates.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws`
//! 2. The connection is registered with the table as a spectator and
//!    receives a `state_update` straight away
//! 3. Two tasks run until either side ends:
//!    - Send task: writes frames queued by the table actor
//!    - Receive task: decodes client actions and forwards them to the table
//! 4. When one task ends the other is aborted and the table is told the
//!    connection is gone
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:8080/ws');
//!
//! ws.onmessage = (event) => {
//!   const data = JSON.parse(event.data);
//!   if (data.type === "state_update") {
//!     updateTableUI(data.view);
//!   } else if (data.type === "error") {
//!     showError(data.code, data.message);
//!   }
//! };
//!
//! ws.send(JSON.stringify({ type: "join_seat", seat: 0, name: "Ann" }));
//! ```

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use setback::table::{ClientAction, ConnectionId, ServerMessage};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::AppState;
use crate::{logging::log_connection_event, metrics};

/// Capacity of the queue for frames the server answers locally (bad requests)
const LOCAL_QUEUE: usize = 8;

/// Why the send task stopped
#[derive(Debug, PartialEq, Eq)]
enum SendExit {
    /// The table dropped this connection's queue: it fell behind
    Dropped,
    /// Writing to the socket failed
    SocketClosed,
}

/// Upgrade HTTP connection to WebSocket for real-time table communication.
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let table = state.table.clone();

    let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(state.outbound_capacity.max(1));
    let connection = match table.connect(outbound_tx).await {
        Ok(connection) => connection,
        Err(e) => {
            error!("Failed to register connection: {}", e);
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };
    let connection_label = connection.to_string();

    metrics::websocket_connections_total();
    metrics::websocket_connections_active(table.registry().len().await);
    log_connection_event(
        "opened",
        Some(&connection_label),
        None,
        "WebSocket connected",
    );

    // Bad-request replies bypass the table
    let (local_tx, mut local_rx) = mpsc::channel::<String>(LOCAL_QUEUE);

    let mut send_task = tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                frame = outbound_rx.recv() => match frame {
                    Some(frame) => frame,
                    None => {
                        let _ = sender.send(Message::Close(None)).await;
                        return SendExit::Dropped;
                    }
                },
                Some(frame) = local_rx.recv() => frame,
            };
            if sender.send(Message::Text(frame.into())).await.is_err() {
                return SendExit::SocketClosed;
            }
            metrics::websocket_messages_sent();
        }
    });

    let recv_table = table.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    metrics::websocket_messages_received();
                    match decode(text.as_str()) {
                        Ok(action) => {
                            if recv_table.submit(connection, action).await.is_err() {
                                warn!(%connection, "Table closed, dropping connection");
                                break;
                            }
                        }
                        Err(reply) => {
                            if let Ok(json) = reply.to_json() {
                                let _ = local_tx.try_send(json);
                            }
                        }
                    }
                }
                Ok(Message::Binary(_)) => {
                    metrics::websocket_bad_requests_total("binary");
                    let reply = ServerMessage::bad_request("binary frames are not supported");
                    if let Ok(json) = reply.to_json() {
                        let _ = local_tx.try_send(json);
                    }
                }
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    warn!(%connection, "WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    // Whichever side ends first takes the other down with it
    tokio::select! {
        exit = &mut send_task => {
            recv_task.abort();
            if matches!(exit, Ok(SendExit::Dropped)) {
                metrics::websocket_stalled_total();
                log_connection_event(
                    "stalled",
                    Some(&connection_label),
                    None,
                    "Outbound queue overflowed, connection dropped",
                );
            }
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    close_connection(&state, connection).await;
}

async fn close_connection(state: &AppState, connection: ConnectionId) {
    let seat = state.table.registry().seat_of(connection).await;
    if let Err(e) = state.table.disconnect(connection).await {
        warn!(%connection, "Failed to notify table of disconnect: {}", e);
    }
    metrics::websocket_connections_active(state.table.registry().len().await);
    log_connection_event(
        "closed",
        Some(&connection.to_string()),
        seat,
        "WebSocket disconnected",
    );
    info!(%connection, ?seat, "WebSocket disconnected");
}

/// Decode a client frame, or build the `bad_request` reply for it.
fn decode(text: &str) -> Result<ClientAction, ServerMessage> {
    serde_json::from_str(text).map_err(|e| {
        metrics::websocket_bad_requests_total("json");
        ServerMessage::bad_request(format!("could not decode message: {e}"))
    })
}
