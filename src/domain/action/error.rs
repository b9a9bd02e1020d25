//! Action executor error types

use thiserror::Error;

/// Failure of a single action; fatal to its step only
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ActionError {
    /// Missing or malformed input, detected before any external call
    #[error("Validation error: {0}")]
    Validation(String),

    /// The provider or network call failed
    #[error("External call to {provider} failed: {message}")]
    ExternalCall { provider: String, message: String },

    #[error("{provider} did not respond within {timeout_ms}ms")]
    Timeout { provider: String, timeout_ms: u64 },

    /// Input variant handed to the wrong executor
    #[error("Executor '{executor}' cannot handle '{input}' input")]
    UnsupportedInput { executor: String, input: String },
}

impl ActionError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn external(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalCall {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn timeout(provider: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            provider: provider.into(),
            timeout_ms,
        }
    }

    pub fn unsupported_input(executor: impl Into<String>, input: impl Into<String>) -> Self {
        Self::UnsupportedInput {
            executor: executor.into(),
            input: input.into(),
        }
    }

    /// Stable category recorded on failed steps
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::ExternalCall { .. } => "external_call_failure",
            Self::Timeout { .. } => "timeout",
            Self::UnsupportedInput { .. } => "unsupported_input",
        }
    }
}

impl From<validator::ValidationErrors> for ActionError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        messages.sort();
        Self::Validation(messages.join("; "))
    }
}
