//! Two cooperating services: a task owner and a job scheduler, linked by a
//! pluggable event transport (HTTP, redis pub/sub, or websocket).

pub mod comm;
pub mod config;
pub mod events;
pub mod gateway;
pub mod listener;
pub mod publisher;
pub mod scheduler;
pub mod server;
pub mod task;
