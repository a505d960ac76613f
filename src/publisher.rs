//! Task event publisher: builds envelopes and hands them to the configured
//! transport. Delivery failures propagate to the calling business operation,
//! which decides whether they are fatal.

use serde_json::json;
use tracing::debug;

use crate::comm::{CommError, CommunicationStrategy};
use crate::events::{EventKind, TaskEvent};
use crate::task::Task;

pub struct TaskEventPublisher {
    strategy: Box<dyn CommunicationStrategy>,
}

impl TaskEventPublisher {
    /// Take ownership of the strategy built by the factory at startup.
    pub fn new(strategy: Box<dyn CommunicationStrategy>) -> Self {
        Self { strategy }
    }

    pub async fn initialize(&self) -> Result<(), CommError> {
        self.strategy.initialize().await
    }

    pub async fn shutdown(&self) {
        self.strategy.shutdown().await;
    }

    pub async fn publish_created(&self, task: &Task) -> Result<(), CommError> {
        self.publish(EventKind::Created, &task.id, Self::task_data(task))
            .await
    }

    pub async fn publish_updated(&self, task: &Task) -> Result<(), CommError> {
        self.publish(EventKind::Updated, &task.id, Self::task_data(task))
            .await
    }

    pub async fn publish_deleted(&self, task_id: &str) -> Result<(), CommError> {
        self.publish(EventKind::Deleted, task_id, json!({})).await
    }

    async fn publish(
        &self,
        kind: EventKind,
        task_id: &str,
        data: serde_json::Value,
    ) -> Result<(), CommError> {
        let event = TaskEvent::new(kind, task_id, data);
        self.strategy.send(&event).await?;
        debug!("Published {} for task {}", kind, task_id);
        Ok(())
    }

    fn task_data(task: &Task) -> serde_json::Value {
        json!({
            "title": task.title,
            "description": task.description,
            "status": task.status,
        })
    }
}
