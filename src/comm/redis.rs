//! Broker transport: publish envelopes to a redis channel.
//!
//! The connection is maintained by a background reconnect loop with a
//! bounded backoff, cancelled through `shutdown`. `send` never waits for a
//! connection: if the broker is not currently reachable the envelope is
//! rejected and the caller decides what to do.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::sync::{Notify, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{reconnect_delay, CommError, CommunicationStrategy, BROKER_CHANNEL};
use crate::events::TaskEvent;

pub struct RedisStrategy {
    url: String,
    conn: Arc<RwLock<Option<MultiplexedConnection>>>,
    /// Signalled by `send` when a publish fails, waking the reconnect loop.
    connection_lost: Arc<Notify>,
    cancel: CancellationToken,
    initialized: AtomicBool,
}

impl RedisStrategy {
    /// Pure construction; connectivity is established by `initialize`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            conn: Arc::new(RwLock::new(None)),
            connection_lost: Arc::new(Notify::new()),
            cancel: CancellationToken::new(),
            initialized: AtomicBool::new(false),
        }
    }

    fn spawn_reconnect_loop(&self, client: redis::Client) {
        let conn = Arc::clone(&self.conn);
        let lost = Arc::clone(&self.connection_lost);
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let mut attempt: u32 = 0;
            loop {
                if cancel.is_cancelled() {
                    break;
                }
                match client.get_multiplexed_async_connection().await {
                    Ok(c) => {
                        info!("Connected to redis broker");
                        *conn.write().await = Some(c);
                        attempt = 0;
                        tokio::select! {
                            _ = lost.notified() => {
                                warn!("Redis broker connection lost, reconnecting");
                                *conn.write().await = None;
                            }
                            _ = cancel.cancelled() => break,
                        }
                    }
                    Err(e) => {
                        attempt += 1;
                        let delay = reconnect_delay(attempt);
                        warn!(
                            "Redis connect attempt {} failed: {} (retrying in {:?})",
                            attempt, e, delay
                        );
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = cancel.cancelled() => break,
                        }
                    }
                }
            }
            debug!("Redis reconnect loop stopped");
        });
    }
}

#[async_trait]
impl CommunicationStrategy for RedisStrategy {
    async fn initialize(&self) -> Result<(), CommError> {
        let client = redis::Client::open(self.url.as_str())
            .map_err(|e| CommError::Connection(format!("invalid redis url: {}", e)))?;

        // Latch only once a client exists, so a failed call stays retryable.
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        // An unreachable broker is not fatal: the loop keeps retrying with
        // bounded backoff until shutdown.
        self.spawn_reconnect_loop(client);
        info!("Redis communication strategy initialized ({})", self.url);
        Ok(())
    }

    async fn send(&self, event: &TaskEvent) -> Result<(), CommError> {
        let mut conn = match self.conn.read().await.clone() {
            Some(conn) => conn,
            None => {
                return Err(CommError::Delivery(
                    "broker connection not established".to_string(),
                ))
            }
        };

        let payload = serde_json::to_string(event)
            .map_err(|e| CommError::Delivery(format!("failed to serialize envelope: {}", e)))?;

        match conn.publish::<_, _, ()>(BROKER_CHANNEL, payload).await {
            Ok(()) => {
                debug!("Event sent via redis: {} for task {}", event.kind, event.task_id);
                Ok(())
            }
            Err(e) => {
                self.connection_lost.notify_one();
                Err(CommError::Delivery(format!("redis publish failed: {}", e)))
            }
        }
    }

    async fn shutdown(&self) {
        self.cancel.cancel();
        *self.conn.write().await = None;
        debug!("Redis communication strategy shut down");
    }
}
