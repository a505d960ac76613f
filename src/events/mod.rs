//! Event contract shared by the task and scheduler services.
//!
//! `TaskEvent` is the wire-level envelope carried across whichever transport
//! is configured. Envelopes are immutable once constructed and carry no
//! schema version; `kind` is the only dispatch key.

pub mod topics;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle event kinds emitted by the task service.
///
/// Unrecognized kinds deserialize to `Unknown` so a receiver can log and
/// skip them instead of rejecting the whole envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "task.created")]
    Created,
    #[serde(rename = "task.updated")]
    Updated,
    #[serde(rename = "task.deleted")]
    Deleted,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Created => write!(f, "task.created"),
            EventKind::Updated => write!(f, "task.updated"),
            EventKind::Deleted => write!(f, "task.deleted"),
            EventKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// The envelope both services agree on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(rename = "taskId")]
    pub task_id: String,
    /// Kind-specific payload: title/description/status for created/updated,
    /// an empty object for deleted.
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl TaskEvent {
    /// Build an envelope stamped with the current time.
    pub fn new(kind: EventKind, task_id: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            kind,
            task_id: task_id.into(),
            data,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_to_wire_names() {
        let event = TaskEvent::new(EventKind::Created, "t1", serde_json::json!({}));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "task.created");
        assert_eq!(json["taskId"], "t1");
    }

    #[test]
    fn unknown_kind_deserializes_to_unknown() {
        let raw = serde_json::json!({
            "type": "task.archived",
            "taskId": "t1",
            "data": {},
            "timestamp": "2026-01-01T00:00:00Z",
        });
        let event: TaskEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(event.kind, EventKind::Unknown);
    }

    #[test]
    fn round_trips_through_json() {
        let event = TaskEvent::new(
            EventKind::Updated,
            "t2",
            serde_json::json!({"title": "updated title"}),
        );
        let raw = serde_json::to_string(&event).unwrap();
        let parsed: TaskEvent = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, event);
    }
}
