//! HTTP surface of the task server.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;

use super::state::*;
use super::{format_uptime, HealthResponse};
use crate::gateway::ws_handler;
use crate::task::{CreateTask, TaskError, UpdateTask};

fn task_error_response(err: TaskError) -> Response {
    let status = match &err {
        TaskError::Validation(_) => StatusCode::BAD_REQUEST,
        TaskError::NotFound(_) => StatusCode::NOT_FOUND,
        TaskError::Publish(_) => StatusCode::BAD_GATEWAY,
        TaskError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

async fn health(State(state): State<TaskServerState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        service: "task-server",
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
    })
}

async fn list_tasks(State(tasks): State<GuardedTaskService>) -> Response {
    match tasks.list() {
        Ok(all) => Json(all).into_response(),
        Err(err) => task_error_response(err),
    }
}

async fn get_task(State(tasks): State<GuardedTaskService>, Path(id): Path<String>) -> Response {
    match tasks.get(&id) {
        Ok(task) => Json(task).into_response(),
        Err(err) => task_error_response(err),
    }
}

async fn create_task(
    State(tasks): State<GuardedTaskService>,
    Json(body): Json<CreateTask>,
) -> Response {
    match tasks.create(body).await {
        Ok(task) => (StatusCode::CREATED, Json(task)).into_response(),
        Err(err) => task_error_response(err),
    }
}

async fn update_task(
    State(tasks): State<GuardedTaskService>,
    Path(id): Path<String>,
    Json(body): Json<UpdateTask>,
) -> Response {
    match tasks.update(&id, body).await {
        Ok(task) => Json(task).into_response(),
        Err(err) => task_error_response(err),
    }
}

async fn delete_task(State(tasks): State<GuardedTaskService>, Path(id): Path<String>) -> Response {
    match tasks.delete(&id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => task_error_response(err),
    }
}

pub fn make_task_app(state: TaskServerState) -> Router {
    let task_routes: Router<TaskServerState> = Router::new()
        .route("/tasks", get(list_tasks))
        .route("/tasks", post(create_task))
        .route("/tasks/{id}", get(get_task))
        .route("/tasks/{id}", put(update_task))
        .route("/tasks/{id}", delete(delete_task))
        .route("/ws", get(ws_handler).with_state(state.ws_context.clone()))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(health))
        .nest("/v1", task_routes)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::{CommError, CommunicationStrategy};
    use crate::events::TaskEvent;
    use crate::gateway::{BroadcastGateway, WsContext};
    use crate::publisher::TaskEventPublisher;
    use crate::task::{SqliteTaskStore, TaskService};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use std::time::Instant;
    use tower::ServiceExt;

    struct NullStrategy;

    #[async_trait]
    impl CommunicationStrategy for NullStrategy {
        async fn initialize(&self) -> Result<(), CommError> {
            Ok(())
        }

        async fn send(&self, _event: &TaskEvent) -> Result<(), CommError> {
            Ok(())
        }

        async fn shutdown(&self) {}
    }

    fn test_app() -> Router {
        let gateway = Arc::new(BroadcastGateway::new());
        let tasks = Arc::new(TaskService::new(
            Arc::new(SqliteTaskStore::in_memory().unwrap()),
            Arc::new(TaskEventPublisher::new(Box::new(NullStrategy))),
            Arc::clone(&gateway),
        ));
        make_task_app(TaskServerState {
            start_time: Instant::now(),
            tasks,
            ws_context: Arc::new(WsContext {
                gateway,
                listener: None,
            }),
            hash: "test".to_string(),
        })
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn task_crud_round_trip() {
        let app = test_app();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/v1/tasks",
                json!({ "title": "write report", "description": "quarterly" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let task = body_json(response).await;
        let id = task["id"].as_str().unwrap().to_string();
        assert_eq!(task["status"], "pending");

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/v1/tasks/{}", id),
                json!({ "status": "in_progress" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "in_progress");

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/v1/tasks/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/v1/tasks/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn blank_title_is_rejected() {
        let app = test_app();
        let response = app
            .oneshot(json_request("POST", "/v1/tasks", json!({ "title": " " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
