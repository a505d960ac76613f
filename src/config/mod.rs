//! Communication configuration shared by both binaries.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Which transport carries task events between the services.
///
/// Exactly one mode is active per process, fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum CommunicationMode {
    /// Synchronous HTTP POST to the scheduler's event endpoint.
    Http,
    /// Publish/subscribe over a redis channel.
    Redis,
    /// Persistent websocket to the scheduler.
    Socketio,
}

impl std::fmt::Display for CommunicationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommunicationMode::Http => write!(f, "http"),
            CommunicationMode::Redis => write!(f, "redis"),
            CommunicationMode::Socketio => write!(f, "socketio"),
        }
    }
}

/// Endpoint parameters for the transports. Only the fields required by the
/// active mode need to be present; the factory validates per mode.
#[derive(Debug, Clone, Default)]
pub struct CommunicationConfig {
    /// Base URL of the scheduler service (http mode).
    pub scheduler_url: Option<String>,
    /// Websocket URL of the scheduler service (socketio mode).
    pub socket_url: Option<String>,
    /// Redis host (redis mode).
    pub redis_host: Option<String>,
    /// Redis port (redis mode).
    pub redis_port: Option<u16>,
}

impl CommunicationConfig {
    /// Redis connection URL, when host and port are both present.
    pub fn redis_url(&self) -> Option<String> {
        match (&self.redis_host, self.redis_port) {
            (Some(host), Some(port)) => Some(format!("redis://{}:{}/", host, port)),
            _ => None,
        }
    }
}
