//! Job lifecycle engine: creation, execution state machine, poller.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::models::{Job, JobStatus};
use super::store::JobStore;
use crate::events::topics;
use crate::gateway::BroadcastGateway;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid schedule request: {0}")]
    Validation(String),
    #[error("job {0} not found")]
    NotFound(String),
    #[error("job is already running")]
    AlreadyRunning,
    #[error("job already completed")]
    AlreadyCompleted,
    #[error("job execution failed: {0}")]
    ExecutionFailed(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// The unit of work a job performs once due.
///
/// Implementations produce either a result string or an error message; the
/// engine owns every status transition around the work.
#[async_trait]
pub trait JobWorker: Send + Sync {
    async fn run(&self, job: &Job) -> Result<String, String>;
}

/// Reference worker: fixed-duration simulated work that always succeeds.
pub struct SimulatedWorker {
    duration: Duration,
}

impl SimulatedWorker {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

#[async_trait]
impl JobWorker for SimulatedWorker {
    async fn run(&self, _job: &Job) -> Result<String, String> {
        tokio::time::sleep(self.duration).await;
        Ok(format!(
            "Job executed successfully at {}",
            Utc::now().to_rfc3339()
        ))
    }
}

pub struct ScheduleService {
    store: Arc<dyn JobStore>,
    gateway: Arc<BroadcastGateway>,
    worker: Arc<dyn JobWorker>,
    poll_interval: Duration,
    /// In-process execution lease. A job id in this set is being executed
    /// right now, even if its `Running` status write has not committed yet,
    /// so a racing caller (or the next poller tick) gets `AlreadyRunning`
    /// instead of a duplicate execution.
    in_flight: Mutex<HashSet<String>>,
}

impl ScheduleService {
    pub fn new(
        store: Arc<dyn JobStore>,
        gateway: Arc<BroadcastGateway>,
        worker: Arc<dyn JobWorker>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            gateway,
            worker,
            poll_interval,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Create a job in `Scheduled` state and broadcast `job.created`.
    pub async fn create(&self, task_id: &str, scheduled_at: &str) -> Result<Job, ScheduleError> {
        if task_id.is_empty() {
            return Err(ScheduleError::Validation("taskId must not be empty".into()));
        }
        let scheduled_at = chrono::DateTime::parse_from_rfc3339(scheduled_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                ScheduleError::Validation(format!("scheduledAt is not a valid timestamp: {}", e))
            })?;

        let job = Job::new(task_id, scheduled_at);
        self.store.insert(&job)?;
        info!("Schedule created: {} for task {}", job.id, job.task_id);

        self.gateway
            .publish(
                topics::JOB_CREATED,
                topics::JobCreatedPayload {
                    id: job.id.clone(),
                    task_id: job.task_id.clone(),
                    scheduled_at: job.scheduled_at,
                    created_at: job.created_at,
                },
            )
            .await;

        Ok(job)
    }

    pub fn get(&self, id: &str) -> Result<Job, ScheduleError> {
        self.store
            .get(id)?
            .ok_or_else(|| ScheduleError::NotFound(id.to_string()))
    }

    pub fn list(&self) -> Result<Vec<Job>, ScheduleError> {
        Ok(self.store.list()?)
    }

    pub fn list_by_task(&self, task_id: &str) -> Result<Vec<Job>, ScheduleError> {
        Ok(self.store.list_by_task(task_id)?)
    }

    /// Run the execution state machine for one job.
    ///
    /// Safe to call redundantly from the poller and a direct trigger: the
    /// guards plus the execution lease make exactly one caller win.
    pub async fn execute(&self, id: &str) -> Result<Job, ScheduleError> {
        let job = self.get(id)?;

        match job.status {
            JobStatus::Running => return Err(ScheduleError::AlreadyRunning),
            // Terminal states have no outgoing transitions.
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled => {
                return Err(ScheduleError::AlreadyCompleted)
            }
            JobStatus::Pending | JobStatus::Scheduled => {}
        }

        {
            let mut in_flight = self.in_flight.lock().unwrap();
            if !in_flight.insert(job.id.clone()) {
                return Err(ScheduleError::AlreadyRunning);
            }
        }

        let result = self.run_to_completion(job).await;
        self.in_flight.lock().unwrap().remove(id);
        result
    }

    async fn run_to_completion(&self, mut job: Job) -> Result<Job, ScheduleError> {
        job.status = JobStatus::Running;
        job.executed_at = Some(Utc::now());
        job.updated_at = Utc::now();
        self.store.update(&job)?;

        info!("Executing job: {}", job.id);

        match self.worker.run(&job).await {
            Ok(result) => {
                job.status = JobStatus::Completed;
                job.result = Some(result);
                job.completed_at = Some(Utc::now());
                job.updated_at = Utc::now();
                self.store.update(&job)?;

                self.gateway
                    .publish(
                        topics::JOB_EXECUTED,
                        topics::JobExecutedPayload {
                            id: job.id.clone(),
                            task_id: job.task_id.clone(),
                            // Set just above, before the worker ran.
                            executed_at: job.executed_at.unwrap_or(job.updated_at),
                            status: "success".to_string(),
                            result: job.result.clone(),
                        },
                    )
                    .await;

                let duration_ms = match (job.completed_at, job.executed_at) {
                    (Some(completed), Some(executed)) => {
                        (completed - executed).num_milliseconds()
                    }
                    _ => 0,
                };
                self.gateway
                    .publish(
                        topics::JOB_COMPLETED,
                        topics::JobCompletedPayload {
                            id: job.id.clone(),
                            task_id: job.task_id.clone(),
                            completed_at: job.completed_at.unwrap_or(job.updated_at),
                            duration_ms,
                        },
                    )
                    .await;

                Ok(job)
            }
            Err(message) => {
                job.status = JobStatus::Failed;
                job.error = Some(message.clone());
                job.completed_at = Some(Utc::now());
                job.updated_at = Utc::now();
                if let Err(e) = self.store.update(&job) {
                    error!("Failed to record failure for job {}: {}", job.id, e);
                }
                Err(ScheduleError::ExecutionFailed(message))
            }
        }
    }

    /// Cancel every waiting job bound to a task. Running and finished jobs
    /// are left untouched. Returns the number of jobs cancelled.
    pub fn cancel_for_task(&self, task_id: &str) -> Result<usize, ScheduleError> {
        let jobs = self.store.list_by_task(task_id)?;
        let mut cancelled = 0;

        for mut job in jobs {
            if matches!(job.status, JobStatus::Pending | JobStatus::Scheduled) {
                job.status = JobStatus::Cancelled;
                job.updated_at = Utc::now();
                self.store.update(&job)?;
                info!("Cancelled job {} for deleted task {}", job.id, task_id);
                cancelled += 1;
            }
        }

        Ok(cancelled)
    }

    /// Spawn the background poller for the lifetime of the process.
    ///
    /// Each tick fetches waiting jobs ordered by `scheduled_at` and executes
    /// every due one; a single job's failure never aborts the tick.
    pub fn spawn_poller(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            info!(
                "Starting job poller with {:?} interval",
                service.poll_interval
            );
            let mut ticker = tokio::time::interval(service.poll_interval);
            // Skip the immediate first tick, wait for the first interval.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => service.run_due_jobs().await,
                    _ = shutdown.cancelled() => break,
                }
            }
            info!("Job poller stopped");
        })
    }

    async fn run_due_jobs(self: &Arc<Self>) {
        let jobs = match self.store.find_pending() {
            Ok(jobs) => jobs,
            Err(e) => {
                error!("Error in job poller: {}", e);
                return;
            }
        };

        let now = Utc::now();
        for job in jobs {
            if !job.is_due(now) {
                continue;
            }
            debug!("Auto-executing scheduled job: {}", job.id);
            let service = Arc::clone(self);
            tokio::spawn(async move {
                if let Err(e) = service.execute(&job.id).await {
                    error!("Failed to execute job {}: {}", job.id, e);
                }
            });
        }
    }
}
