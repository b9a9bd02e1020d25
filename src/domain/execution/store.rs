//! Execution store contract

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::domain::DomainError;
use crate::domain::workflow::WorkflowId;

use super::entity::{
    ExecutionId, ExecutionOutcome, NewStep, StepPatch, WorkflowExecution, WorkflowStep,
};

/// Persistence for executions and their step trace.
///
/// Must accept concurrent appends from independent executions. Once an
/// execution is terminal, `append_step`, `update_step` and a second
/// `finalize_execution` fail with `Conflict`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    async fn create_execution(
        &self,
        workflow_id: &WorkflowId,
        trigger_event: serde_json::Value,
    ) -> Result<WorkflowExecution, DomainError>;

    /// Append a step with the next `step_order`
    async fn append_step(
        &self,
        execution_id: &ExecutionId,
        step: NewStep,
    ) -> Result<WorkflowStep, DomainError>;

    async fn update_step(
        &self,
        execution_id: &ExecutionId,
        step_order: u32,
        patch: StepPatch,
    ) -> Result<WorkflowStep, DomainError>;

    async fn finalize_execution(
        &self,
        execution_id: &ExecutionId,
        outcome: ExecutionOutcome,
    ) -> Result<WorkflowExecution, DomainError>;

    async fn get_execution(
        &self,
        execution_id: &ExecutionId,
    ) -> Result<Option<WorkflowExecution>, DomainError>;

    /// Steps ordered by `step_order`
    async fn list_steps(
        &self,
        execution_id: &ExecutionId,
    ) -> Result<Vec<WorkflowStep>, DomainError>;

    /// Executions of a workflow, newest first
    async fn list_executions(
        &self,
        workflow_id: &WorkflowId,
        limit: usize,
    ) -> Result<Vec<WorkflowExecution>, DomainError>;

    /// Most recently completed execution of a workflow, by completion time
    async fn last_completed_execution(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<Option<WorkflowExecution>, DomainError>;

    /// Ask a running execution to stop at the next step boundary.
    ///
    /// Returns `false` if the execution is already terminal.
    async fn request_cancellation(&self, execution_id: &ExecutionId) -> Result<bool, DomainError>;

    async fn is_cancellation_requested(
        &self,
        execution_id: &ExecutionId,
    ) -> Result<bool, DomainError>;
}
