//! Pluggable communication layer between the task and scheduler services.
//!
//! Three interchangeable strategies satisfy one contract: a synchronous HTTP
//! call, a redis pub/sub channel, and a persistent websocket. The active
//! strategy is selected once at startup via [`factory::create`] and owned
//! explicitly by the publisher; callers never branch on the variant.

mod factory;
mod http;
mod redis;
mod socket;

pub use factory::create;
pub use http::HttpStrategy;
pub use redis::RedisStrategy;
pub use socket::SocketStrategy;

use async_trait::async_trait;
use thiserror::Error;

use crate::events::TaskEvent;

/// Name of the redis channel carrying serialized envelopes.
pub const BROKER_CHANNEL: &str = "task-events";

/// Message type used for envelopes on the websocket transport.
pub const SOCKET_EVENT_TYPE: &str = "task.event";

#[derive(Debug, Error)]
pub enum CommError {
    /// The factory was given an incomplete configuration for the selected mode.
    #[error("invalid communication configuration: {0}")]
    Configuration(String),
    /// The transport could not establish connectivity.
    #[error("failed to establish connection: {0}")]
    Connection(String),
    /// A send call could not reach the peer.
    #[error("failed to deliver event: {0}")]
    Delivery(String),
}

/// One contract for all three transports.
#[async_trait]
pub trait CommunicationStrategy: Send + Sync {
    /// Establish whatever connectivity the transport needs.
    async fn initialize(&self) -> Result<(), CommError>;

    /// Transmit one envelope. Never queues implicitly: either the envelope
    /// reaches the transport or the caller gets an error.
    async fn send(&self, event: &TaskEvent) -> Result<(), CommError>;

    /// Best-effort teardown; never fails.
    async fn shutdown(&self);
}

/// Reconnect delay shared by the broker publisher and subscriber loops:
/// `min(attempt * 50ms, 2s)`.
pub(crate) fn reconnect_delay(attempt: u32) -> std::time::Duration {
    std::time::Duration::from_millis(u64::from(attempt.saturating_mul(50)).min(2000))
}
