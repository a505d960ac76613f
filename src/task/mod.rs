//! Task records, persistence and the CRUD service that fans mutations out
//! to websocket clients and the scheduler.

mod models;
mod service;
mod store;

pub use models::{Task, TaskStatus};
pub use service::{CreateTask, TaskError, TaskService, UpdateTask};
pub use store::{SqliteTaskStore, TaskStore};
