//! Test server lifecycle management
//!
//! Spawns isolated instances of the scheduler and task servers on random
//! ports, each with its own temporary SQLite database.

use super::constants::*;
use std::sync::Arc;
use std::time::{Duration, Instant};
use taskbridge::comm;
use taskbridge::config::{CommunicationConfig, CommunicationMode};
use taskbridge::gateway::{BroadcastGateway, WsContext};
use taskbridge::listener::EventListener;
use taskbridge::publisher::TaskEventPublisher;
use taskbridge::scheduler::{ScheduleService, SimulatedWorker, SqliteJobStore};
use taskbridge::server::{
    make_scheduler_app, make_task_app, ScheduleServerState, TaskServerState,
};
use taskbridge::task::{SqliteTaskStore, TaskService};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// A running scheduler server instance.
///
/// When dropped, the server and its poller shut down and the temp database
/// is cleaned up.
pub struct SchedulerServer {
    pub base_url: String,
    pub port: u16,
    pub scheduler: Arc<ScheduleService>,

    _temp_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    shutdown: CancellationToken,
}

impl SchedulerServer {
    pub async fn spawn() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("jobs.db");
        let store = Arc::new(SqliteJobStore::new(&db_path).expect("Failed to open job store"));

        let gateway = Arc::new(BroadcastGateway::new());
        let scheduler = Arc::new(ScheduleService::new(
            store,
            Arc::clone(&gateway),
            Arc::new(SimulatedWorker::new(Duration::from_millis(
                TEST_WORK_DURATION_MS,
            ))),
            Duration::from_millis(TEST_POLL_INTERVAL_MS),
        ));
        let listener = Arc::new(EventListener::new(Arc::clone(&scheduler)));

        let shutdown = CancellationToken::new();
        scheduler.spawn_poller(shutdown.clone());

        let state = ScheduleServerState {
            start_time: Instant::now(),
            scheduler: Arc::clone(&scheduler),
            listener: Arc::clone(&listener),
            ws_context: Arc::new(WsContext {
                gateway,
                listener: Some(listener),
            }),
            hash: "test".to_string(),
        };
        let app = make_scheduler_app(state);

        let (base_url, port, shutdown_tx) = serve(app).await;
        let server = Self {
            base_url,
            port,
            scheduler,
            _temp_dir: temp_dir,
            _shutdown_tx: Some(shutdown_tx),
            shutdown,
        };
        wait_for_ready(&server.base_url).await;
        server
    }
}

impl Drop for SchedulerServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// A running task server instance wired to a scheduler over HTTP.
pub struct TaskServer {
    pub base_url: String,
    pub port: u16,

    _temp_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TaskServer {
    /// Spawns a task server publishing events to `scheduler_url` via the
    /// HTTP strategy.
    pub async fn spawn_http(scheduler_url: &str) -> Self {
        let config = CommunicationConfig {
            scheduler_url: Some(scheduler_url.to_string()),
            ..Default::default()
        };
        let strategy = comm::create(CommunicationMode::Http, &config)
            .expect("Failed to create http strategy");

        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("tasks.db");
        let store = Arc::new(SqliteTaskStore::new(&db_path).expect("Failed to open task store"));

        let publisher = Arc::new(TaskEventPublisher::new(strategy));
        publisher
            .initialize()
            .await
            .expect("Failed to initialize strategy");

        let gateway = Arc::new(BroadcastGateway::new());
        let tasks = Arc::new(TaskService::new(
            store,
            publisher,
            Arc::clone(&gateway),
        ));

        let state = TaskServerState {
            start_time: Instant::now(),
            tasks,
            ws_context: Arc::new(WsContext {
                gateway,
                listener: None,
            }),
            hash: "test".to_string(),
        };
        let app = make_task_app(state);

        let (base_url, port, shutdown_tx) = serve(app).await;
        let server = Self {
            base_url,
            port,
            _temp_dir: temp_dir,
            _shutdown_tx: Some(shutdown_tx),
        };
        wait_for_ready(&server.base_url).await;
        server
    }
}

impl Drop for TaskServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn serve(app: axum::Router) -> (String, u16, tokio::sync::oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let port = listener
        .local_addr()
        .expect("Failed to get local address")
        .port();
    let base_url = format!("http://127.0.0.1:{}", port);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .expect("Server failed");
    });

    (base_url, port, shutdown_tx)
}

async fn wait_for_ready(base_url: &str) {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(100))
        .build()
        .expect("Failed to build reqwest client");

    let start = std::time::Instant::now();
    let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

    loop {
        if start.elapsed() > timeout {
            panic!(
                "Server did not become ready within {}ms",
                SERVER_READY_TIMEOUT_MS
            );
        }

        match client.get(format!("{}/health", base_url)).send().await {
            Ok(response) if response.status().is_success() => return,
            _ => {
                tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
            }
        }
    }
}
