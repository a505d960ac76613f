//! Task persistence.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

use super::models::{Task, TaskStatus};

pub trait TaskStore: Send + Sync {
    fn insert(&self, task: &Task) -> Result<()>;
    fn get(&self, id: &str) -> Result<Option<Task>>;
    fn list(&self) -> Result<Vec<Task>>;
    fn update(&self, task: &Task) -> Result<()>;
    fn delete(&self, id: &str) -> Result<bool>;
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

pub struct SqliteTaskStore {
    conn: Mutex<Connection>,
}

impl SqliteTaskStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        if !path.exists() {
            info!("Creating new task database at {:?}", path);
        }
        let conn = Connection::open(path).context("Failed to open task database")?;
        conn.execute_batch(SCHEMA)
            .context("Failed to create tasks schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        conn.execute_batch(SCHEMA)
            .context("Failed to create tasks schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn parse_datetime(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
        let status_str: String = row.get("status")?;
        let created_at: String = row.get("created_at")?;
        let updated_at: String = row.get("updated_at")?;

        Ok(Task {
            id: row.get("id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            status: TaskStatus::parse(&status_str).unwrap_or(TaskStatus::Pending),
            created_at: Self::parse_datetime(&created_at),
            updated_at: Self::parse_datetime(&updated_at),
        })
    }
}

impl TaskStore for SqliteTaskStore {
    fn insert(&self, task: &Task) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO tasks (id, title, description, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                task.id,
                task.title,
                task.description,
                task.status.as_str(),
                task.created_at.to_rfc3339(),
                task.updated_at.to_rfc3339(),
            ],
        )
        .context("Failed to insert task")?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Task>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM tasks WHERE id = ?1",
            params![id],
            Self::row_to_task,
        )
        .optional()
        .context("Failed to fetch task")
    }

    fn list(&self) -> Result<Vec<Task>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT * FROM tasks ORDER BY created_at DESC")?;
        let tasks = stmt
            .query_map([], Self::row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list tasks")?;
        Ok(tasks)
    }

    fn update(&self, task: &Task) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "UPDATE tasks SET title = ?2, description = ?3, status = ?4, updated_at = ?5
                 WHERE id = ?1",
                params![
                    task.id,
                    task.title,
                    task.description,
                    task.status.as_str(),
                    task.updated_at.to_rfc3339(),
                ],
            )
            .context("Failed to update task")?;
        anyhow::ensure!(changed == 1, "Task {} not found for update", task.id);
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])
            .context("Failed to delete task")?;
        Ok(changed > 0)
    }
}
