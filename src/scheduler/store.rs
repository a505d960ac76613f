//! Job persistence.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

use super::models::{Job, JobStatus};

/// Durable record store for jobs. Jobs are inserted and updated, never
/// deleted; terminal jobs are retained as history.
pub trait JobStore: Send + Sync {
    fn insert(&self, job: &Job) -> Result<()>;
    fn get(&self, id: &str) -> Result<Option<Job>>;
    fn list(&self) -> Result<Vec<Job>>;
    fn list_by_task(&self, task_id: &str) -> Result<Vec<Job>>;
    /// All jobs in Pending or Scheduled state, ordered by `scheduled_at`
    /// ascending. The poller's due-selection query.
    fn find_pending(&self) -> Result<Vec<Job>>;
    fn update(&self, job: &Job) -> Result<()>;
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS jobs (
    id TEXT PRIMARY KEY,
    task_id TEXT NOT NULL,
    scheduled_at TEXT NOT NULL,
    status TEXT NOT NULL,
    result TEXT,
    error TEXT,
    executed_at TEXT,
    completed_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_jobs_task_id ON jobs(task_id);
CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);
";

pub struct SqliteJobStore {
    conn: Mutex<Connection>,
}

impl SqliteJobStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        if !path.exists() {
            info!("Creating new job database at {:?}", path);
        }
        let conn = Connection::open(path).context("Failed to open job database")?;
        conn.execute_batch(SCHEMA)
            .context("Failed to create jobs schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        conn.execute_batch(SCHEMA)
            .context("Failed to create jobs schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339()
    }

    fn parse_datetime(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<Job> {
        let status_str: String = row.get("status")?;
        let status = JobStatus::parse(&status_str).unwrap_or(JobStatus::Failed);

        let scheduled_at: String = row.get("scheduled_at")?;
        let executed_at: Option<String> = row.get("executed_at")?;
        let completed_at: Option<String> = row.get("completed_at")?;
        let created_at: String = row.get("created_at")?;
        let updated_at: String = row.get("updated_at")?;

        Ok(Job {
            id: row.get("id")?,
            task_id: row.get("task_id")?,
            scheduled_at: Self::parse_datetime(&scheduled_at),
            status,
            result: row.get("result")?,
            error: row.get("error")?,
            executed_at: executed_at.as_deref().map(Self::parse_datetime),
            completed_at: completed_at.as_deref().map(Self::parse_datetime),
            created_at: Self::parse_datetime(&created_at),
            updated_at: Self::parse_datetime(&updated_at),
        })
    }
}

impl JobStore for SqliteJobStore {
    fn insert(&self, job: &Job) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO jobs (id, task_id, scheduled_at, status, result, error,
                               executed_at, completed_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                job.id,
                job.task_id,
                Self::format_datetime(&job.scheduled_at),
                job.status.as_str(),
                job.result,
                job.error,
                job.executed_at.as_ref().map(Self::format_datetime),
                job.completed_at.as_ref().map(Self::format_datetime),
                Self::format_datetime(&job.created_at),
                Self::format_datetime(&job.updated_at),
            ],
        )
        .context("Failed to insert job")?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Job>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM jobs WHERE id = ?1",
            params![id],
            Self::row_to_job,
        )
        .optional()
        .context("Failed to fetch job")
    }

    fn list(&self) -> Result<Vec<Job>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT * FROM jobs ORDER BY created_at DESC")?;
        let jobs = stmt
            .query_map([], Self::row_to_job)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list jobs")?;
        Ok(jobs)
    }

    fn list_by_task(&self, task_id: &str) -> Result<Vec<Job>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT * FROM jobs WHERE task_id = ?1 ORDER BY created_at DESC")?;
        let jobs = stmt
            .query_map(params![task_id], Self::row_to_job)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list jobs by task")?;
        Ok(jobs)
    }

    fn find_pending(&self) -> Result<Vec<Job>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM jobs WHERE status IN ('pending', 'scheduled')
             ORDER BY scheduled_at ASC",
        )?;
        let jobs = stmt
            .query_map([], Self::row_to_job)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to find pending jobs")?;
        Ok(jobs)
    }

    fn update(&self, job: &Job) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "UPDATE jobs SET scheduled_at = ?2, status = ?3, result = ?4, error = ?5,
                                 executed_at = ?6, completed_at = ?7, updated_at = ?8
                 WHERE id = ?1",
                params![
                    job.id,
                    Self::format_datetime(&job.scheduled_at),
                    job.status.as_str(),
                    job.result,
                    job.error,
                    job.executed_at.as_ref().map(Self::format_datetime),
                    job.completed_at.as_ref().map(Self::format_datetime),
                    Self::format_datetime(&job.updated_at),
                ],
            )
            .context("Failed to update job")?;
        anyhow::ensure!(changed == 1, "Job {} not found for update", job.id);
        Ok(())
    }
}
