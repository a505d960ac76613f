//! Broadcast topic names and payload shapes.
//!
//! These are the fire-and-forget notifications pushed to connected
//! websocket clients, distinct from the cross-service `TaskEvent` envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const TASK_CREATED: &str = "task.created";
pub const TASK_UPDATED: &str = "task.updated";
pub const TASK_DELETED: &str = "task.deleted";

pub const JOB_CREATED: &str = "job.created";
pub const JOB_EXECUTED: &str = "job.executed";
pub const JOB_COMPLETED: &str = "job.completed";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobCreatedPayload {
    pub id: String,
    pub task_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobExecutedPayload {
    pub id: String,
    pub task_id: String,
    pub executed_at: DateTime<Utc>,
    pub status: String,
    pub result: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobCompletedPayload {
    pub id: String,
    pub task_id: String,
    pub completed_at: DateTime<Utc>,
    /// `completed_at - executed_at` in milliseconds.
    pub duration_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskChangedPayload {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskDeletedPayload {
    pub id: String,
    pub deleted_at: DateTime<Utc>,
}
