//! Workflow error types

use thiserror::Error;

use crate::domain::DomainError;

/// Errors surfaced to callers of the workflow engine.
///
/// Step-level failures are recorded on the step and never show up here; this
/// enum covers definition problems and persistence failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WorkflowError {
    #[error("Workflow not found: {0}")]
    NotFound(String),

    #[error("Execution not found: {0}")]
    ExecutionNotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Workflow has no trigger node: {0}")]
    MissingTrigger(String),

    #[error("Workflow is inactive: {0}")]
    Inactive(String),

    #[error("Invalid predicate in node '{node}': {message}")]
    InvalidPredicate { node: String, message: String },

    #[error("Execution store error: {0}")]
    Store(String),
}

impl WorkflowError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    pub fn execution_not_found(id: impl Into<String>) -> Self {
        Self::ExecutionNotFound(id.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn missing_trigger(id: impl Into<String>) -> Self {
        Self::MissingTrigger(id.into())
    }

    pub fn inactive(id: impl Into<String>) -> Self {
        Self::Inactive(id.into())
    }

    pub fn invalid_predicate(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPredicate {
            node: node.into(),
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }
}

impl From<DomainError> for WorkflowError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { message } => Self::NotFound(message),
            DomainError::Validation { message } | DomainError::InvalidId { message } => {
                Self::Validation(message)
            }
            other => Self::Store(other.to_string()),
        }
    }
}

impl From<WorkflowError> for DomainError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::NotFound(message) | WorkflowError::ExecutionNotFound(message) => {
                DomainError::not_found(message)
            }
            WorkflowError::Validation(_)
            | WorkflowError::MissingTrigger(_)
            | WorkflowError::Inactive(_)
            | WorkflowError::InvalidPredicate { .. } => DomainError::validation(err.to_string()),
            WorkflowError::Store(message) => DomainError::storage(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WorkflowError::not_found("welcome-flow");
        assert_eq!(err.to_string(), "Workflow not found: welcome-flow");

        let err = WorkflowError::invalid_predicate("branch-1", "unexpected token '>'");
        assert_eq!(
            err.to_string(),
            "Invalid predicate in node 'branch-1': unexpected token '>'"
        );
    }

    #[test]
    fn test_domain_error_conversion() {
        let err: WorkflowError = DomainError::not_found("missing").into();
        assert_eq!(err, WorkflowError::NotFound("missing".to_string()));

        let err: WorkflowError = DomainError::storage("connection reset").into();
        assert!(matches!(err, WorkflowError::Store(_)));

        let back: DomainError = WorkflowError::inactive("welcome-flow").into();
        assert!(matches!(back, DomainError::Validation { .. }));
    }
}
