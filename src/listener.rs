//! Inbound task event ingestion on the scheduler side.
//!
//! The listener is transport-agnostic: the HTTP route, the websocket handler
//! and the redis subscriber all funnel envelopes into [`EventListener::handle`].
//! Ingestion never fails the transport; problems are logged and the envelope
//! is acknowledged regardless.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::comm::{reconnect_delay, BROKER_CHANNEL};
use crate::events::{EventKind, TaskEvent};
use crate::scheduler::ScheduleService;

/// How far in the future a job is scheduled for a newly created task.
const AUTO_SCHEDULE_DELAY_MINUTES: i64 = 5;

pub struct EventListener {
    scheduler: Arc<ScheduleService>,
}

impl EventListener {
    pub fn new(scheduler: Arc<ScheduleService>) -> Self {
        Self { scheduler }
    }

    /// Dispatch one envelope. Infallible by contract: event ingestion must
    /// not bounce errors back to the transport.
    pub async fn handle(&self, event: &TaskEvent) {
        match event.kind {
            EventKind::Created => self.on_created(event).await,
            EventKind::Updated => {
                info!("Task updated: {} (no scheduling action)", event.task_id);
            }
            EventKind::Deleted => self.on_deleted(event),
            EventKind::Unknown => {
                warn!("Ignoring unknown event type for task {}", event.task_id);
            }
        }
    }

    async fn on_created(&self, event: &TaskEvent) {
        let scheduled_at = (Utc::now() + ChronoDuration::minutes(AUTO_SCHEDULE_DELAY_MINUTES))
            .to_rfc3339();
        match self.scheduler.create(&event.task_id, &scheduled_at).await {
            Ok(job) => info!(
                "Scheduled job {} for new task {} at {}",
                job.id, event.task_id, scheduled_at
            ),
            Err(e) => error!("Failed to schedule job for task {}: {}", event.task_id, e),
        }
    }

    fn on_deleted(&self, event: &TaskEvent) {
        match self.scheduler.cancel_for_task(&event.task_id) {
            Ok(0) => info!("Task deleted: {} (no jobs to cancel)", event.task_id),
            Ok(count) => info!(
                "Cancelled {} job(s) for deleted task {}",
                count, event.task_id
            ),
            Err(e) => error!("Failed to cancel jobs for task {}: {}", event.task_id, e),
        }
    }
}

/// Subscribe to the broker channel and feed envelopes into the listener.
///
/// Runs until cancelled, resubscribing with linear backoff when the broker
/// connection drops.
pub fn spawn_redis_subscriber(
    redis_url: String,
    listener: Arc<EventListener>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut attempt: u32 = 0;
        loop {
            if shutdown.is_cancelled() {
                break;
            }
            match subscribe_once(&redis_url, &listener, &shutdown).await {
                Ok(()) => break,
                Err(e) => {
                    attempt += 1;
                    let delay = reconnect_delay(attempt);
                    warn!(
                        "Broker subscription lost ({}), retrying in {:?}",
                        e, delay
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.cancelled() => break,
                    }
                }
            }
        }
        info!("Broker subscriber stopped");
    })
}

/// One subscription session. Returns `Ok` only on shutdown; any broker
/// failure surfaces as an error so the caller can back off and retry.
async fn subscribe_once(
    redis_url: &str,
    listener: &EventListener,
    shutdown: &CancellationToken,
) -> Result<(), redis::RedisError> {
    let client = redis::Client::open(redis_url)?;
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(BROKER_CHANNEL).await?;
    info!("Subscribed to broker channel {}", BROKER_CHANNEL);

    let mut stream = pubsub.on_message();
    loop {
        tokio::select! {
            msg = stream.next() => {
                let Some(msg) = msg else {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        "broker message stream ended",
                    )
                    .into());
                };
                let payload: String = msg.get_payload()?;
                match serde_json::from_str::<TaskEvent>(&payload) {
                    Ok(event) => listener.handle(&event).await,
                    Err(e) => warn!("Discarding malformed broker message: {}", e),
                }
            }
            _ = shutdown.cancelled() => return Ok(()),
        }
    }
}
