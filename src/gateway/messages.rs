//! Websocket message envelopes.
//!
//! One generic shape in each direction; topic-specific payloads are carried
//! as JSON values.

use serde::{Deserialize, Serialize};

/// Server -> client message. `msg_type` is the broadcast topic
/// (e.g. "job.completed", "task.created").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub payload: serde_json::Value,
}

impl ServerMessage {
    pub fn new(msg_type: impl Into<String>, payload: impl Serialize) -> Self {
        Self {
            msg_type: msg_type.into(),
            payload: serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
        }
    }

    pub fn empty(msg_type: impl Into<String>) -> Self {
        Self {
            msg_type: msg_type.into(),
            payload: serde_json::Value::Null,
        }
    }
}

/// Client -> server message. The scheduler accepts `task.event` messages
/// carrying a `TaskEvent` envelope as payload (the duplex receiving side).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}
