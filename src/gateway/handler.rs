//! Websocket route handler: upgrade, forward loop, cleanup.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, warn};

use super::messages::ClientMessage;
use super::BroadcastGateway;
use crate::comm::SOCKET_EVENT_TYPE;
use crate::events::TaskEvent;
use crate::listener::EventListener;

/// Shared websocket state for a server.
pub struct WsContext {
    pub gateway: Arc<BroadcastGateway>,
    /// Present on the scheduler server only: inbound `task.event` messages
    /// are dispatched here (the duplex receiving side).
    pub listener: Option<Arc<EventListener>>,
}

/// Route handler for `GET /v1/ws`.
pub async fn ws_handler(ws: WebSocketUpgrade, State(ctx): State<Arc<WsContext>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, ctx))
}

async fn handle_socket(socket: WebSocket, ctx: Arc<WsContext>) {
    let (conn_id, mut outgoing_rx) = ctx.gateway.register().await;
    debug!("Websocket client {} connected", conn_id);

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Forward broadcasts to this client.
    let outgoing = tokio::spawn(async move {
        while let Some(msg) = outgoing_rx.recv().await {
            let raw = match serde_json::to_string(&msg) {
                Ok(raw) => raw,
                Err(e) => {
                    error!("Failed to serialize outgoing message: {}", e);
                    continue;
                }
            };
            if ws_sink.send(Message::Text(raw.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => handle_client_message(text.as_str(), &ctx).await,
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Websocket error from client {}: {}", conn_id, e);
                break;
            }
        }
    }

    ctx.gateway.unregister(conn_id).await;
    outgoing.abort();
    debug!("Websocket client {} disconnected", conn_id);
}

async fn handle_client_message(raw: &str, ctx: &WsContext) {
    let message: ClientMessage = match serde_json::from_str(raw) {
        Ok(message) => message,
        Err(e) => {
            warn!("Malformed websocket message: {}", e);
            return;
        }
    };

    if message.msg_type != SOCKET_EVENT_TYPE {
        debug!("Ignoring websocket message type {}", message.msg_type);
        return;
    }

    let Some(listener) = &ctx.listener else {
        debug!("Ignoring task.event: this server does not ingest events");
        return;
    };

    match serde_json::from_value::<TaskEvent>(message.payload) {
        Ok(event) => listener.handle(&event).await,
        Err(e) => warn!("Invalid task.event payload: {}", e),
    }
}
