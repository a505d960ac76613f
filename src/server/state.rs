use axum::extract::FromRef;

use std::sync::Arc;
use std::time::Instant;

use crate::gateway::WsContext;
use crate::listener::EventListener;
use crate::scheduler::ScheduleService;
use crate::task::TaskService;

pub type GuardedScheduleService = Arc<ScheduleService>;
pub type GuardedEventListener = Arc<EventListener>;
pub type GuardedTaskService = Arc<TaskService>;
pub type GuardedWsContext = Arc<WsContext>;

/// State of the scheduler server: the job engine plus event ingestion.
#[derive(Clone)]
pub struct ScheduleServerState {
    pub start_time: Instant,
    pub scheduler: GuardedScheduleService,
    pub listener: GuardedEventListener,
    pub ws_context: GuardedWsContext,
    pub hash: String,
}

impl FromRef<ScheduleServerState> for GuardedScheduleService {
    fn from_ref(input: &ScheduleServerState) -> Self {
        input.scheduler.clone()
    }
}

impl FromRef<ScheduleServerState> for GuardedEventListener {
    fn from_ref(input: &ScheduleServerState) -> Self {
        input.listener.clone()
    }
}

impl FromRef<ScheduleServerState> for GuardedWsContext {
    fn from_ref(input: &ScheduleServerState) -> Self {
        input.ws_context.clone()
    }
}

/// State of the task server: CRUD service plus its broadcast context.
#[derive(Clone)]
pub struct TaskServerState {
    pub start_time: Instant,
    pub tasks: GuardedTaskService,
    pub ws_context: GuardedWsContext,
    pub hash: String,
}

impl FromRef<TaskServerState> for GuardedTaskService {
    fn from_ref(input: &TaskServerState) -> Self {
        input.tasks.clone()
    }
}

impl FromRef<TaskServerState> for GuardedWsContext {
    fn from_ref(input: &TaskServerState) -> Self {
        input.ws_context.clone()
    }
}
