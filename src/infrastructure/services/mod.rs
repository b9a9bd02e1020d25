//! Infrastructure services

mod event_service;
mod workflow_service;

pub use event_service::{Dispatch, DispatchResult, EventService, IngestReceipt};
pub use workflow_service::{
    CreateWorkflowRequest, UpdateWorkflowRequest, ValidationReport, WorkflowService,
    validate_definition,
};
