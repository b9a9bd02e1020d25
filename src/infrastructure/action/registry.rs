//! Action executor registry

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::domain::action::{ActionError, ActionExecutor, ActionInput, ActionKind};

/// Maps each action kind to its executor
#[derive(Default, Clone)]
pub struct ActionExecutorRegistry {
    executors: HashMap<ActionKind, Arc<dyn ActionExecutor>>,
}

impl std::fmt::Debug for ActionExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionExecutorRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl ActionExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executor, replacing any previous one of the same kind
    pub fn register(&mut self, executor: Arc<dyn ActionExecutor>) {
        let kind = executor.kind();
        info!(kind = %kind, "Registering action executor");
        self.executors.insert(kind, executor);
    }

    pub fn with_executor(mut self, executor: Arc<dyn ActionExecutor>) -> Self {
        self.register(executor);
        self
    }

    pub fn get(&self, kind: ActionKind) -> Option<Arc<dyn ActionExecutor>> {
        self.executors.get(&kind).cloned()
    }

    pub fn contains(&self, kind: ActionKind) -> bool {
        self.executors.contains_key(&kind)
    }

    /// Registered kinds, in a stable order
    pub fn kinds(&self) -> Vec<ActionKind> {
        let mut kinds: Vec<ActionKind> = self.executors.keys().copied().collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }

    /// Dispatch `input` to the executor of its kind
    pub async fn execute(&self, input: &ActionInput) -> Result<Value, ActionError> {
        let kind = input.kind();
        let executor = self
            .executors
            .get(&kind)
            .ok_or_else(|| ActionError::unsupported_input("registry", kind.as_str()))?;

        debug!(kind = %kind, "Dispatching action");
        executor.execute(input).await
    }
}
