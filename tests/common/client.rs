//! HTTP client for end-to-end tests
//!
//! Thin wrapper around reqwest covering both servers' endpoints. When a
//! route or request shape changes, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

pub struct TestClient {
    pub client: reqwest::Client,
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    // ========================================================================
    // Scheduler endpoints
    // ========================================================================

    /// POST /v1/jobs
    pub async fn create_job(&self, task_id: &str, scheduled_at: &str) -> Response {
        self.client
            .post(format!("{}/v1/jobs", self.base_url))
            .json(&json!({ "taskId": task_id, "scheduledAt": scheduled_at }))
            .send()
            .await
            .expect("Create job request failed")
    }

    /// GET /v1/jobs
    pub async fn list_jobs(&self) -> Response {
        self.client
            .get(format!("{}/v1/jobs", self.base_url))
            .send()
            .await
            .expect("List jobs request failed")
    }

    /// GET /v1/jobs/{id}
    pub async fn get_job(&self, id: &str) -> Response {
        self.client
            .get(format!("{}/v1/jobs/{}", self.base_url, id))
            .send()
            .await
            .expect("Get job request failed")
    }

    /// POST /v1/jobs/{id}/execute
    pub async fn execute_job(&self, id: &str) -> Response {
        self.client
            .post(format!("{}/v1/jobs/{}/execute", self.base_url, id))
            .send()
            .await
            .expect("Execute job request failed")
    }

    /// GET /v1/tasks/{task_id}/jobs
    pub async fn jobs_for_task(&self, task_id: &str) -> Response {
        self.client
            .get(format!("{}/v1/tasks/{}/jobs", self.base_url, task_id))
            .send()
            .await
            .expect("Jobs for task request failed")
    }

    /// POST /api/v1/events/task
    pub async fn post_event(&self, event: &serde_json::Value) -> Response {
        self.client
            .post(format!("{}/api/v1/events/task", self.base_url))
            .json(event)
            .send()
            .await
            .expect("Post event request failed")
    }

    // ========================================================================
    // Task endpoints
    // ========================================================================

    /// POST /v1/tasks
    pub async fn create_task(&self, title: &str, description: Option<&str>) -> Response {
        self.client
            .post(format!("{}/v1/tasks", self.base_url))
            .json(&json!({ "title": title, "description": description }))
            .send()
            .await
            .expect("Create task request failed")
    }

    /// GET /v1/tasks
    pub async fn list_tasks(&self) -> Response {
        self.client
            .get(format!("{}/v1/tasks", self.base_url))
            .send()
            .await
            .expect("List tasks request failed")
    }

    /// GET /v1/tasks/{id}
    pub async fn get_task(&self, id: &str) -> Response {
        self.client
            .get(format!("{}/v1/tasks/{}", self.base_url, id))
            .send()
            .await
            .expect("Get task request failed")
    }

    /// PUT /v1/tasks/{id}
    pub async fn update_task(&self, id: &str, body: &serde_json::Value) -> Response {
        self.client
            .put(format!("{}/v1/tasks/{}", self.base_url, id))
            .json(body)
            .send()
            .await
            .expect("Update task request failed")
    }

    /// DELETE /v1/tasks/{id}
    pub async fn delete_task(&self, id: &str) -> Response {
        self.client
            .delete(format!("{}/v1/tasks/{}", self.base_url, id))
            .send()
            .await
            .expect("Delete task request failed")
    }
}
