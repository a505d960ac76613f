//! Job lifecycle engine: records, persistence, execution state machine and
//! the background poller that promotes due jobs.

mod models;
mod service;
mod store;

pub use models::{Job, JobStatus};
pub use service::{JobWorker, ScheduleError, ScheduleService, SimulatedWorker};
pub use store::{JobStore, SqliteJobStore};
