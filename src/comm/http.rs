//! Direct-call transport: synchronous HTTP POST to the scheduler.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use super::{CommError, CommunicationStrategy};
use crate::events::TaskEvent;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts each envelope to `{base_url}/api/v1/events/task` and requires an
/// acknowledgement. No retry; the caller decides whether to retry.
pub struct HttpStrategy {
    client: Client,
    base_url: String,
}

impl HttpStrategy {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn events_url(&self) -> String {
        format!("{}/api/v1/events/task", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CommunicationStrategy for HttpStrategy {
    async fn initialize(&self) -> Result<(), CommError> {
        // Stateless transport, nothing to establish up front.
        info!("HTTP communication strategy initialized ({})", self.base_url);
        Ok(())
    }

    async fn send(&self, event: &TaskEvent) -> Result<(), CommError> {
        let response = self
            .client
            .post(self.events_url())
            .json(event)
            .send()
            .await
            .map_err(|e| CommError::Delivery(format!("http request failed: {}", e)))?;

        response
            .error_for_status()
            .map_err(|e| CommError::Delivery(format!("scheduler rejected event: {}", e)))?;

        debug!("Event sent via HTTP: {} for task {}", event.kind, event.task_id);
        Ok(())
    }

    async fn shutdown(&self) {
        debug!("HTTP communication strategy shut down");
    }
}
