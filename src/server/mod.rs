//! HTTP servers: route tables, shared state and the serve loop.

mod schedule_routes;
mod state;
mod task_routes;

pub use schedule_routes::make_scheduler_app;
pub use state::{ScheduleServerState, TaskServerState};
pub use task_routes::make_task_app;

use anyhow::Result;
use std::time::Duration;

use axum::Router;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub uptime: String,
    pub hash: String,
}

pub(crate) fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

/// Bind and serve until the shutdown token fires.
pub async fn run_server(app: Router, port: u16, shutdown: CancellationToken) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Listening on port {}", port);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
