use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tokio_util::sync::CancellationToken;

use taskbridge::comm;
use taskbridge::config::{CommunicationConfig, CommunicationMode};
use taskbridge::gateway::{BroadcastGateway, WsContext};
use taskbridge::publisher::TaskEventPublisher;
use taskbridge::server::{make_task_app, run_server, TaskServerState};
use taskbridge::task::{SqliteTaskStore, TaskService};

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite tasks database file.
    #[clap(default_value = "tasks.db")]
    pub tasks_db: PathBuf,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001, env = "PORT")]
    pub port: u16,

    /// Transport carrying task events to the scheduler.
    #[clap(long, default_value = "http", env = "COMMUNICATION_MODE")]
    pub communication_mode: CommunicationMode,

    /// Base URL of the scheduler service (http mode).
    #[clap(long, default_value = "http://localhost:3002", env = "SCHEDULER_URL")]
    pub scheduler_url: String,

    /// Websocket URL of the scheduler service (socketio mode).
    #[clap(long, default_value = "ws://localhost:3002/v1/ws", env = "SOCKET_URL")]
    pub socket_url: String,

    /// Redis host (redis mode).
    #[clap(long, default_value = "localhost", env = "REDIS_HOST")]
    pub redis_host: String,

    /// Redis port (redis mode).
    #[clap(long, default_value_t = 6379, env = "REDIS_PORT")]
    pub redis_port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    info!(
        "Opening SQLite tasks database at {:?}...",
        cli_args.tasks_db
    );
    let store = Arc::new(SqliteTaskStore::new(&cli_args.tasks_db)?);

    let comm_config = CommunicationConfig {
        scheduler_url: Some(cli_args.scheduler_url),
        socket_url: Some(cli_args.socket_url),
        redis_host: Some(cli_args.redis_host),
        redis_port: Some(cli_args.redis_port),
    };
    info!(
        "Using {} communication strategy",
        cli_args.communication_mode
    );
    let strategy = comm::create(cli_args.communication_mode, &comm_config)?;
    let publisher = Arc::new(TaskEventPublisher::new(strategy));
    publisher
        .initialize()
        .await
        .context("Failed to initialize communication strategy")?;

    let gateway = Arc::new(BroadcastGateway::new());
    let tasks = Arc::new(TaskService::new(
        store,
        Arc::clone(&publisher),
        Arc::clone(&gateway),
    ));

    let state = TaskServerState {
        start_time: Instant::now(),
        tasks,
        ws_context: Arc::new(WsContext {
            gateway,
            listener: None,
        }),
        hash: env!("GIT_HASH").to_string(),
    };
    let app = make_task_app(state);

    let shutdown = CancellationToken::new();
    info!("Ready to serve at port {}!", cli_args.port);
    let server = tokio::spawn(run_server(app, cli_args.port, shutdown.clone()));

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");
    shutdown.cancel();
    publisher.shutdown().await;
    server.await??;
    Ok(())
}
