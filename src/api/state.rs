//! Application state shared by the handlers

use std::sync::Arc;

use crate::domain::execution::ExecutionStore;
use crate::infrastructure::services::{EventService, WorkflowService};
use crate::infrastructure::workflow::ExecutionEventHub;

#[derive(Clone)]
pub struct AppState {
    pub workflow_service: Arc<WorkflowService>,
    pub event_service: Arc<EventService>,
    pub execution_store: Arc<dyn ExecutionStore>,
    pub event_hub: Arc<ExecutionEventHub>,
}

impl AppState {
    pub fn new(
        workflow_service: Arc<WorkflowService>,
        event_service: Arc<EventService>,
        execution_store: Arc<dyn ExecutionStore>,
        event_hub: Arc<ExecutionEventHub>,
    ) -> Self {
        Self {
            workflow_service,
            event_service,
            execution_store,
            event_hub,
        }
    }
}
