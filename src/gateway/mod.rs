//! Broadcast gateway: fire-and-forget fan-out to connected websocket clients.
//!
//! The rest of the system only relies on `publish(topic, payload)`;
//! delivery is best-effort and failures are counted, never surfaced as
//! errors to the emitting component.

pub mod handler;
pub mod messages;

pub use handler::{ws_handler, WsContext};

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use messages::ServerMessage;

/// Tracks all active websocket connections.
pub struct BroadcastGateway {
    connections: RwLock<HashMap<usize, mpsc::Sender<ServerMessage>>>,
    next_id: AtomicUsize,
}

impl Default for BroadcastGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastGateway {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            next_id: AtomicUsize::new(1),
        }
    }

    /// Register a new connection.
    ///
    /// Returns the connection id and a receiver for outgoing messages; the
    /// caller forwards messages from the receiver to the websocket.
    pub async fn register(&self) -> (usize, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(32);
        let conn_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.connections.write().await.insert(conn_id, tx);
        (conn_id, rx)
    }

    /// Unregister a connection (called on disconnect).
    pub async fn unregister(&self, conn_id: usize) {
        self.connections.write().await.remove(&conn_id);
    }

    /// Broadcast a payload to all connected clients under a topic.
    ///
    /// Returns the number of connections that could not be reached.
    pub async fn publish(&self, topic: &str, payload: impl Serialize) -> usize {
        let message = ServerMessage::new(topic, payload);
        let conns = self.connections.read().await;
        let mut failed = 0;

        for sender in conns.values() {
            if sender.send(message.clone()).await.is_err() {
                failed += 1;
            }
        }

        if failed > 0 {
            debug!("Broadcast {} failed for {} connections", topic, failed);
        }
        failed
    }

    /// Number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}
