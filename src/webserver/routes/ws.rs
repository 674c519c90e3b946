//! WebSocket endpoint and per-connection task
//!
//! One lightweight task per connection reads inbound frames and forwards
//! hub broadcasts. Envelope handling is awaited inline, so a
//! connection's second message is never processed before the first has
//! been persisted and broadcast. Decode and store failures reply to this
//! connection only; the loop continues. Transport failures break the
//! loop, and removal from the registry runs before the task exits, so no
//! later broadcast targets a closed connection.
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;

use crate::{
    arguments::is_debug_webserver_enabled,
    hub::{envelope, ConnectionId, ServerMessage},
    logger::{self, LogTag},
    webserver::state::AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(ws_handler))
}

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

/// Drive one WebSocket connection for its whole lifetime
pub async fn handle_connection(mut socket: WebSocket, state: Arc<AppState>) {
    // Register with the hub; refused once shutdown has begun
    let Some((conn_id, mut hub_rx)) = state.hub.connect().await else {
        let _ = socket.send(Message::Close(None)).await;
        return;
    };

    let (mut ws_tx, mut ws_rx) = socket.split();

    if is_debug_webserver_enabled() {
        logger::debug(LogTag::Webserver, &format!("connection {} started", conn_id));
    }

    loop {
        tokio::select! {
            biased;

            // Broadcasts and queued replies from the hub
            outbound = hub_rx.recv() => {
                match outbound {
                    Some(message) => {
                        if let Err(e) = send_message(&mut ws_tx, &message).await {
                            logger::warning(
                                LogTag::Webserver,
                                &format!("connection {}: failed to send message: {}", conn_id, e),
                            );
                            break;
                        }
                    }
                    // Hub shutdown drained the registry
                    None => break,
                }
            }

            // Inbound telemetry frames
            inbound = ws_rx.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = handle_text_frame(&text, conn_id, &mut ws_tx, &state).await {
                            logger::warning(
                                LogTag::Webserver,
                                &format!("connection {}: failed to send reply: {}", conn_id, e),
                            );
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        // Axum answers pings automatically
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        if is_debug_webserver_enabled() {
                            logger::debug(
                                LogTag::Webserver,
                                &format!("connection {}: client closed", conn_id),
                            );
                        }
                        break;
                    }
                    Some(Err(e)) => {
                        logger::warning(
                            LogTag::Webserver,
                            &format!("connection {}: websocket error: {}", conn_id, e),
                        );
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    // Removal is synchronous with close; idempotent on duplicate close
    state.hub.disconnect(conn_id).await;

    if is_debug_webserver_enabled() {
        logger::debug(LogTag::Webserver, &format!("connection {} closed", conn_id));
    }
}

/// Decode one text frame and route it through the hub
///
/// A decode failure is recoverable: the sender gets an `error` reply and
/// the connection stays open. Only transport failures are returned.
async fn handle_text_frame(
    text: &str,
    conn_id: ConnectionId,
    ws_tx: &mut futures::stream::SplitSink<WebSocket, Message>,
    state: &Arc<AppState>,
) -> Result<(), axum::Error> {
    let reply = match envelope::decode(text) {
        Ok(env) => state.hub.handle_envelope(conn_id, env).await,
        Err(e) => {
            state.hub.metrics().decode_error();
            if is_debug_webserver_enabled() {
                logger::debug(
                    LogTag::Webserver,
                    &format!("connection {}: decode failed: {}", conn_id, e),
                );
            }
            Some(ServerMessage::Error {
                message: e.to_string(),
            })
        }
    };

    if let Some(reply) = reply {
        send_message(ws_tx, &reply).await?;
    }
    Ok(())
}

/// Serialize and send one message to the client
async fn send_message(
    ws_tx: &mut futures::stream::SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    match message.to_json() {
        Ok(json) => ws_tx.send(Message::Text(json)).await,
        Err(e) => {
            logger::error(
                LogTag::Webserver,
                &format!("failed to serialize {} message: {}", message.kind(), e),
            );
            // Don't break the connection on a serialization error
            Ok(())
        }
    }
}
