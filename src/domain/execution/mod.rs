//! Execution domain - run records, step trace and the store contract

mod entity;
mod store;

pub use entity::{
    ExecutionId, ExecutionMetrics, ExecutionOutcome, ExecutionStatus, NewStep, StepPatch,
    StepStatus, StepType, WorkflowExecution, WorkflowStep,
};
pub use store::ExecutionStore;

#[cfg(test)]
pub use store::MockExecutionStore;
