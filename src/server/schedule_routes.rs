//! HTTP surface of the scheduler server.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::state::*;
use super::{format_uptime, HealthResponse};
use crate::events::TaskEvent;
use crate::gateway::ws_handler;
use crate::scheduler::ScheduleError;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CreateJobBody {
    pub task_id: String,
    pub scheduled_at: String,
}

fn error_response(status: StatusCode, err: impl std::fmt::Display) -> Response {
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

fn schedule_error_response(err: ScheduleError) -> Response {
    let status = match &err {
        ScheduleError::Validation(_) => StatusCode::BAD_REQUEST,
        ScheduleError::NotFound(_) => StatusCode::NOT_FOUND,
        ScheduleError::AlreadyRunning | ScheduleError::AlreadyCompleted => StatusCode::CONFLICT,
        ScheduleError::ExecutionFailed(_) | ScheduleError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, err)
}

async fn health(State(state): State<ScheduleServerState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        service: "scheduler-server",
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
    })
}

/// Receiving end of the HTTP transport. Always acknowledges a well-formed
/// envelope; ingestion outcomes are logged, not returned.
async fn ingest_task_event(
    State(listener): State<GuardedEventListener>,
    Json(event): Json<TaskEvent>,
) -> Response {
    debug!("Received {} for task {}", event.kind, event.task_id);
    listener.handle(&event).await;
    Json(json!({ "message": "Event received and processed" })).into_response()
}

async fn create_job(
    State(scheduler): State<GuardedScheduleService>,
    Json(body): Json<CreateJobBody>,
) -> Response {
    match scheduler.create(&body.task_id, &body.scheduled_at).await {
        Ok(job) => (StatusCode::CREATED, Json(job)).into_response(),
        Err(err) => schedule_error_response(err),
    }
}

async fn list_jobs(State(scheduler): State<GuardedScheduleService>) -> Response {
    match scheduler.list() {
        Ok(jobs) => Json(jobs).into_response(),
        Err(err) => schedule_error_response(err),
    }
}

async fn get_job(
    State(scheduler): State<GuardedScheduleService>,
    Path(id): Path<String>,
) -> Response {
    match scheduler.get(&id) {
        Ok(job) => Json(job).into_response(),
        Err(err) => schedule_error_response(err),
    }
}

async fn execute_job(
    State(scheduler): State<GuardedScheduleService>,
    Path(id): Path<String>,
) -> Response {
    match scheduler.execute(&id).await {
        Ok(job) => Json(job).into_response(),
        Err(err) => schedule_error_response(err),
    }
}

async fn list_jobs_for_task(
    State(scheduler): State<GuardedScheduleService>,
    Path(task_id): Path<String>,
) -> Response {
    match scheduler.list_by_task(&task_id) {
        Ok(jobs) => Json(jobs).into_response(),
        Err(err) => schedule_error_response(err),
    }
}

pub fn make_scheduler_app(state: ScheduleServerState) -> Router {
    let job_routes: Router<ScheduleServerState> = Router::new()
        .route("/jobs", post(create_job))
        .route("/jobs", get(list_jobs))
        .route("/jobs/{id}", get(get_job))
        .route("/jobs/{id}/execute", post(execute_job))
        .route("/tasks/{task_id}/jobs", get(list_jobs_for_task))
        .route("/ws", get(ws_handler).with_state(state.ws_context.clone()))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/events/task", post(ingest_task_event))
        .nest("/v1", job_routes)
        .with_state(state)
}
