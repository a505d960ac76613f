//! Duplex transport: persistent websocket to the scheduler.
//!
//! `initialize` blocks until the connection is confirmed open or a fixed
//! timeout elapses. `send` fails immediately while disconnected; there is no
//! implicit queuing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{CommError, CommunicationStrategy, SOCKET_EVENT_TYPE};
use crate::events::TaskEvent;
use crate::gateway::messages::ClientMessage;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

pub struct SocketStrategy {
    url: String,
    sink: Arc<Mutex<Option<WsSink>>>,
    cancel: CancellationToken,
}

impl SocketStrategy {
    /// Pure construction; the connection is opened by `initialize`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            sink: Arc::new(Mutex::new(None)),
            cancel: CancellationToken::new(),
        }
    }
}

#[async_trait]
impl CommunicationStrategy for SocketStrategy {
    async fn initialize(&self) -> Result<(), CommError> {
        let connect = connect_async(self.url.as_str());
        let (stream, _response) = match tokio::time::timeout(CONNECT_TIMEOUT, connect).await {
            Ok(Ok(connected)) => connected,
            Ok(Err(e)) => {
                return Err(CommError::Connection(format!(
                    "websocket connect failed: {}",
                    e
                )))
            }
            Err(_) => return Err(CommError::Connection("connection timeout".to_string())),
        };

        info!("Connected to scheduler via websocket ({})", self.url);

        let (ws_sink, mut ws_stream) = stream.split();
        *self.sink.lock().await = Some(ws_sink);

        // Drain the read half so peer close marks the channel disconnected.
        let sink = Arc::clone(&self.sink);
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    msg = ws_stream.next() => match msg {
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                            warn!("Websocket closed by peer");
                            *sink.lock().await = None;
                            break;
                        }
                        Some(Ok(_)) => {}
                    },
                    _ = cancel.cancelled() => break,
                }
            }
            debug!("Websocket read loop stopped");
        });

        Ok(())
    }

    async fn send(&self, event: &TaskEvent) -> Result<(), CommError> {
        let mut guard = self.sink.lock().await;
        let sink = guard
            .as_mut()
            .ok_or_else(|| CommError::Delivery("websocket not connected".to_string()))?;

        let message = ClientMessage {
            msg_type: SOCKET_EVENT_TYPE.to_string(),
            payload: serde_json::to_value(event)
                .map_err(|e| CommError::Delivery(format!("failed to serialize envelope: {}", e)))?,
        };
        let raw = serde_json::to_string(&message)
            .map_err(|e| CommError::Delivery(format!("failed to serialize message: {}", e)))?;

        match sink.send(Message::text(raw)).await {
            Ok(()) => {
                debug!(
                    "Event sent via websocket: {} for task {}",
                    event.kind, event.task_id
                );
                Ok(())
            }
            Err(e) => {
                *guard = None;
                Err(CommError::Delivery(format!("websocket send failed: {}", e)))
            }
        }
    }

    async fn shutdown(&self) {
        self.cancel.cancel();
        if let Some(mut sink) = self.sink.lock().await.take() {
            let _ = sink.send(Message::Close(None)).await;
        }
        debug!("Websocket communication strategy shut down");
    }
}
