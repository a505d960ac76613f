//! Task business logic: CRUD plus event fan-out.
//!
//! Every mutation broadcasts to the service's own websocket clients and then
//! publishes a `TaskEvent` to the scheduler through the configured
//! transport. Publish failures propagate: the record is already persisted,
//! but the caller learns the scheduler was not notified.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::models::{Task, TaskStatus};
use super::store::TaskStore;
use crate::comm::CommError;
use crate::events::topics;
use crate::gateway::BroadcastGateway;
use crate::publisher::TaskEventPublisher;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("invalid task request: {0}")]
    Validation(String),
    #[error("task {0} not found")]
    NotFound(String),
    #[error("failed to publish task event: {0}")]
    Publish(#[from] CommError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
}

pub struct TaskService {
    store: Arc<dyn TaskStore>,
    publisher: Arc<TaskEventPublisher>,
    gateway: Arc<BroadcastGateway>,
}

impl TaskService {
    pub fn new(
        store: Arc<dyn TaskStore>,
        publisher: Arc<TaskEventPublisher>,
        gateway: Arc<BroadcastGateway>,
    ) -> Self {
        Self {
            store,
            publisher,
            gateway,
        }
    }

    pub fn list(&self) -> Result<Vec<Task>, TaskError> {
        Ok(self.store.list()?)
    }

    pub fn get(&self, id: &str) -> Result<Task, TaskError> {
        self.store
            .get(id)?
            .ok_or_else(|| TaskError::NotFound(id.to_string()))
    }

    pub async fn create(&self, request: CreateTask) -> Result<Task, TaskError> {
        if request.title.trim().is_empty() {
            return Err(TaskError::Validation("title must not be empty".into()));
        }

        let task = Task::new(request.title, request.description);
        self.store.insert(&task)?;
        info!("Task created: {}", task.id);

        self.gateway
            .publish(topics::TASK_CREATED, Self::changed_payload(&task))
            .await;
        self.publisher.publish_created(&task).await?;

        Ok(task)
    }

    pub async fn update(&self, id: &str, request: UpdateTask) -> Result<Task, TaskError> {
        let mut task = self.get(id)?;

        if let Some(title) = request.title {
            if title.trim().is_empty() {
                return Err(TaskError::Validation("title must not be empty".into()));
            }
            task.title = title;
        }
        if let Some(description) = request.description {
            task.description = Some(description);
        }
        if let Some(status) = request.status {
            task.status = status;
        }
        task.updated_at = Utc::now();
        self.store.update(&task)?;
        info!("Task updated: {}", task.id);

        self.gateway
            .publish(topics::TASK_UPDATED, Self::changed_payload(&task))
            .await;
        self.publisher.publish_updated(&task).await?;

        Ok(task)
    }

    pub async fn delete(&self, id: &str) -> Result<(), TaskError> {
        // Ensure the task exists before deleting.
        self.get(id)?;
        self.store.delete(id)?;
        info!("Task deleted: {}", id);

        self.gateway
            .publish(
                topics::TASK_DELETED,
                topics::TaskDeletedPayload {
                    id: id.to_string(),
                    deleted_at: Utc::now(),
                },
            )
            .await;
        self.publisher.publish_deleted(id).await?;

        Ok(())
    }

    fn changed_payload(task: &Task) -> topics::TaskChangedPayload {
        topics::TaskChangedPayload {
            id: task.id.clone(),
            title: Some(task.title.clone()),
            description: task.description.clone(),
            status: Some(task.status.as_str().to_string()),
        }
    }
}
