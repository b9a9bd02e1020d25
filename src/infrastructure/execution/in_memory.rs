//! In-memory execution store

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::domain::DomainError;
use crate::domain::execution::{
    ExecutionId, ExecutionOutcome, ExecutionStatus, ExecutionStore, NewStep, StepPatch,
    WorkflowExecution, WorkflowStep,
};
use crate::domain::workflow::WorkflowId;

#[derive(Debug)]
struct ExecutionRecord {
    execution: WorkflowExecution,
    steps: Vec<WorkflowStep>,
}

impl ExecutionRecord {
    fn ensure_running(&self) -> Result<(), DomainError> {
        if self.execution.is_terminal() {
            return Err(DomainError::conflict(format!(
                "Execution '{}' is already {}",
                self.execution.id,
                self.execution.status.as_str()
            )));
        }
        Ok(())
    }
}

/// Execution store backed by a process-local map.
///
/// Steps live next to their execution, so `step_order` is simply the
/// position in the step list plus one.
#[derive(Debug, Default)]
pub struct InMemoryExecutionStore {
    records: RwLock<HashMap<ExecutionId, ExecutionRecord>>,
}

impl InMemoryExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn missing(execution_id: &ExecutionId) -> DomainError {
    DomainError::not_found(format!("Execution '{}' not found", execution_id))
}

#[async_trait]
impl ExecutionStore for InMemoryExecutionStore {
    async fn create_execution(
        &self,
        workflow_id: &WorkflowId,
        trigger_event: Value,
    ) -> Result<WorkflowExecution, DomainError> {
        let execution = WorkflowExecution::start(workflow_id.clone(), trigger_event);
        let mut records = self.records.write().await;

        records.insert(
            execution.id,
            ExecutionRecord {
                execution: execution.clone(),
                steps: Vec::new(),
            },
        );

        Ok(execution)
    }

    async fn append_step(
        &self,
        execution_id: &ExecutionId,
        step: NewStep,
    ) -> Result<WorkflowStep, DomainError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(execution_id).ok_or_else(|| missing(execution_id))?;
        record.ensure_running()?;

        let step_order = record.steps.len() as u32 + 1;
        let step = WorkflowStep::from_new(*execution_id, step_order, step);
        record.steps.push(step.clone());

        Ok(step)
    }

    async fn update_step(
        &self,
        execution_id: &ExecutionId,
        step_order: u32,
        patch: StepPatch,
    ) -> Result<WorkflowStep, DomainError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(execution_id).ok_or_else(|| missing(execution_id))?;
        record.ensure_running()?;

        let step = record
            .steps
            .iter_mut()
            .find(|s| s.step_order == step_order)
            .ok_or_else(|| {
                DomainError::not_found(format!(
                    "Step {} of execution '{}' not found",
                    step_order, execution_id
                ))
            })?;
        step.apply(patch);

        Ok(step.clone())
    }

    async fn finalize_execution(
        &self,
        execution_id: &ExecutionId,
        outcome: ExecutionOutcome,
    ) -> Result<WorkflowExecution, DomainError> {
        if !outcome.status.is_terminal() {
            return Err(DomainError::validation(
                "An execution can only be finalized with a terminal status",
            ));
        }

        let mut records = self.records.write().await;
        let record = records.get_mut(execution_id).ok_or_else(|| missing(execution_id))?;
        record.ensure_running()?;

        let execution = &mut record.execution;
        execution.status = outcome.status;
        execution.metrics = Some(outcome.metrics);
        execution.error_summary = outcome.error_summary;
        execution.result = outcome.result;
        execution.completed_at = Some(Utc::now());

        Ok(execution.clone())
    }

    async fn get_execution(
        &self,
        execution_id: &ExecutionId,
    ) -> Result<Option<WorkflowExecution>, DomainError> {
        let records = self.records.read().await;
        Ok(records.get(execution_id).map(|r| r.execution.clone()))
    }

    async fn list_steps(&self, execution_id: &ExecutionId) -> Result<Vec<WorkflowStep>, DomainError> {
        let records = self.records.read().await;
        let record = records.get(execution_id).ok_or_else(|| missing(execution_id))?;
        Ok(record.steps.clone())
    }

    async fn list_executions(
        &self,
        workflow_id: &WorkflowId,
        limit: usize,
    ) -> Result<Vec<WorkflowExecution>, DomainError> {
        let records = self.records.read().await;
        let mut executions: Vec<WorkflowExecution> = records
            .values()
            .filter(|r| &r.execution.workflow_id == workflow_id)
            .map(|r| r.execution.clone())
            .collect();

        executions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        executions.truncate(limit);
        Ok(executions)
    }

    async fn last_completed_execution(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<Option<WorkflowExecution>, DomainError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .map(|r| &r.execution)
            .filter(|e| &e.workflow_id == workflow_id && e.status == ExecutionStatus::Completed)
            .max_by_key(|e| e.completed_at)
            .cloned())
    }

    async fn request_cancellation(&self, execution_id: &ExecutionId) -> Result<bool, DomainError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(execution_id).ok_or_else(|| missing(execution_id))?;

        if record.execution.is_terminal() {
            return Ok(false);
        }
        record.execution.cancel_requested = true;
        Ok(true)
    }

    async fn is_cancellation_requested(
        &self,
        execution_id: &ExecutionId,
    ) -> Result<bool, DomainError> {
        let records = self.records.read().await;
        let record = records.get(execution_id).ok_or_else(|| missing(execution_id))?;
        Ok(record.execution.cancel_requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::execution::{ExecutionMetrics, StepStatus, StepType};
    use serde_json::json;
    use std::sync::Arc;

    fn workflow_id() -> WorkflowId {
        WorkflowId::new("welcome-flow").unwrap()
    }

    fn outcome(status: ExecutionStatus) -> ExecutionOutcome {
        ExecutionOutcome {
            status,
            metrics: ExecutionMetrics::default(),
            error_summary: None,
            result: Some(json!({"promo": {"code": "A1"}})),
        }
    }

    #[tokio::test]
    async fn test_step_order_is_sequential() {
        let store = InMemoryExecutionStore::new();
        let execution = store.create_execution(&workflow_id(), json!({})).await.unwrap();

        for _ in 0..3 {
            store
                .append_step(&execution.id, NewStep::running(StepType::ActionExecution))
                .await
                .unwrap();
        }

        let orders: Vec<u32> = store
            .list_steps(&execution.id)
            .await
            .unwrap()
            .iter()
            .map(|s| s.step_order)
            .collect();
        assert_eq!(orders, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_update_step_patches_status() {
        let store = InMemoryExecutionStore::new();
        let execution = store.create_execution(&workflow_id(), json!({})).await.unwrap();
        let step = store
            .append_step(&execution.id, NewStep::running(StepType::TriggerValidation))
            .await
            .unwrap();

        let updated = store
            .update_step(&execution.id, step.step_order, StepPatch::completed(json!({"ok": true}), 3))
            .await
            .unwrap();

        assert_eq!(updated.status, StepStatus::Completed);
        assert_eq!(updated.output, Some(json!({"ok": true})));

        let missing = store.update_step(&execution.id, 9, StepPatch::default()).await;
        assert!(matches!(missing, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_terminal_execution_rejects_writes() {
        let store = InMemoryExecutionStore::new();
        let execution = store.create_execution(&workflow_id(), json!({})).await.unwrap();
        store
            .finalize_execution(&execution.id, outcome(ExecutionStatus::Failed))
            .await
            .unwrap();

        let append = store
            .append_step(&execution.id, NewStep::running(StepType::ActionExecution))
            .await;
        assert!(matches!(append, Err(DomainError::Conflict { .. })));

        let again = store
            .finalize_execution(&execution.id, outcome(ExecutionStatus::Completed))
            .await;
        assert!(matches!(again, Err(DomainError::Conflict { .. })));

        assert!(!store.request_cancellation(&execution.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_finalize_requires_terminal_status() {
        let store = InMemoryExecutionStore::new();
        let execution = store.create_execution(&workflow_id(), json!({})).await.unwrap();

        let result = store
            .finalize_execution(&execution.id, outcome(ExecutionStatus::Running))
            .await;
        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_last_completed_ignores_failed_runs() {
        let store = InMemoryExecutionStore::new();
        let first = store.create_execution(&workflow_id(), json!({})).await.unwrap();
        store
            .finalize_execution(&first.id, outcome(ExecutionStatus::Completed))
            .await
            .unwrap();

        let second = store.create_execution(&workflow_id(), json!({})).await.unwrap();
        store
            .finalize_execution(&second.id, outcome(ExecutionStatus::Failed))
            .await
            .unwrap();

        let last = store.last_completed_execution(&workflow_id()).await.unwrap().unwrap();
        assert_eq!(last.id, first.id);

        let other = WorkflowId::new("other").unwrap();
        assert!(store.last_completed_execution(&other).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_executions_newest_first_with_limit() {
        let store = InMemoryExecutionStore::new();
        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(store.create_execution(&workflow_id(), json!({})).await.unwrap().id);
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let listed = store.list_executions(&workflow_id(), 2).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, ids[2]);
        assert_eq!(listed[1].id, ids[1]);
    }

    #[tokio::test]
    async fn test_cancellation_flag() {
        let store = InMemoryExecutionStore::new();
        let execution = store.create_execution(&workflow_id(), json!({})).await.unwrap();

        assert!(!store.is_cancellation_requested(&execution.id).await.unwrap());
        assert!(store.request_cancellation(&execution.id).await.unwrap());
        assert!(store.is_cancellation_requested(&execution.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_appends_keep_orders_unique() {
        let store = Arc::new(InMemoryExecutionStore::new());
        let execution = store.create_execution(&workflow_id(), json!({})).await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                let id = execution.id;
                tokio::spawn(async move {
                    store
                        .append_step(&id, NewStep::running(StepType::ActionExecution))
                        .await
                        .unwrap()
                        .step_order
                })
            })
            .collect();

        let mut orders = Vec::new();
        for handle in handles {
            orders.push(handle.await.unwrap());
        }
        orders.sort_unstable();

        assert_eq!(orders, (1..=16).collect::<Vec<u32>>());
    }
}
