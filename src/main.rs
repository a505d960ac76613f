use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tokio_util::sync::CancellationToken;

use taskbridge::config::CommunicationMode;
use taskbridge::gateway::{BroadcastGateway, WsContext};
use taskbridge::listener::{spawn_redis_subscriber, EventListener};
use taskbridge::scheduler::{ScheduleService, SimulatedWorker, SqliteJobStore};
use taskbridge::server::{make_scheduler_app, run_server, ScheduleServerState};

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite jobs database file.
    #[clap(default_value = "jobs.db")]
    pub jobs_db: PathBuf,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3002, env = "PORT")]
    pub port: u16,

    /// Transport carrying task events from the task service.
    #[clap(long, default_value = "http", env = "COMMUNICATION_MODE")]
    pub communication_mode: CommunicationMode,

    /// Redis host for the broker subscription (redis mode).
    #[clap(long, default_value = "localhost", env = "REDIS_HOST")]
    pub redis_host: String,

    /// Redis port for the broker subscription (redis mode).
    #[clap(long, default_value_t = 6379, env = "REDIS_PORT")]
    pub redis_port: u16,

    /// Seconds between poller scans for due jobs.
    #[clap(long, default_value_t = 5)]
    pub poll_interval_secs: u64,

    /// Milliseconds of simulated work per job execution.
    #[clap(long, default_value_t = 2000)]
    pub work_duration_ms: u64,
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

    info!("Opening SQLite jobs database at {:?}...", cli_args.jobs_db);
    let store = Arc::new(SqliteJobStore::new(&cli_args.jobs_db)?);

    let gateway = Arc::new(BroadcastGateway::new());
    let scheduler = Arc::new(ScheduleService::new(
        store,
        Arc::clone(&gateway),
        Arc::new(SimulatedWorker::new(Duration::from_millis(
            cli_args.work_duration_ms,
        ))),
        Duration::from_secs(cli_args.poll_interval_secs),
    ));
    let listener = Arc::new(EventListener::new(Arc::clone(&scheduler)));

    let shutdown = CancellationToken::new();
    let poller = scheduler.spawn_poller(shutdown.clone());
    info!(
        "Job poller running every {}s",
        cli_args.poll_interval_secs
    );

    let subscriber = match cli_args.communication_mode {
        CommunicationMode::Redis => {
            let redis_url = format!(
                "redis://{}:{}/",
                cli_args.redis_host, cli_args.redis_port
            );
            info!("Subscribing to broker at {}", redis_url);
            Some(spawn_redis_subscriber(
                redis_url,
                Arc::clone(&listener),
                shutdown.clone(),
            ))
        }
        mode => {
            info!("Communication mode {}: events arrive inbound", mode);
            None
        }
    };

    let state = ScheduleServerState {
        start_time: Instant::now(),
        scheduler,
        listener: Arc::clone(&listener),
        ws_context: Arc::new(WsContext {
            gateway,
            listener: Some(listener),
        }),
        hash: env!("GIT_HASH").to_string(),
    };
    let app = make_scheduler_app(state);

    info!("Ready to serve at port {}!", cli_args.port);
    let server = tokio::spawn(run_server(app, cli_args.port, shutdown.clone()));

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");
    shutdown.cancel();

    if let Err(e) = poller.await {
        warn!("Poller task ended abnormally: {}", e);
    }
    if let Some(subscriber) = subscriber {
        if let Err(e) = subscriber.await {
            warn!("Broker subscriber ended abnormally: {}", e);
        }
    }
    server.await??;
    Ok(())
}
