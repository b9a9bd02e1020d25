//! Event service - fans incoming events out to matching workflows

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use crate::domain::execution::WorkflowExecution;
use crate::domain::workflow::{WorkflowError, WorkflowId};
use crate::domain::UserEvent;
use crate::infrastructure::workflow::{ExecutionOrchestrator, TriggerMatcher};

/// Workflows an event was dispatched to
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReceipt {
    pub event_id: String,
    pub matched_workflows: Vec<WorkflowId>,
}

/// One spawned execution
#[derive(Debug)]
pub struct Dispatch {
    pub workflow_id: WorkflowId,
    pub handle: JoinHandle<Result<WorkflowExecution, WorkflowError>>,
}

/// Outcome of one dispatched execution
#[derive(Debug)]
pub struct DispatchResult {
    pub workflow_id: WorkflowId,
    pub outcome: Result<WorkflowExecution, WorkflowError>,
}

#[derive(Debug, Clone)]
pub struct EventService {
    matcher: TriggerMatcher,
    orchestrator: Arc<ExecutionOrchestrator>,
}

impl EventService {
    pub fn new(matcher: TriggerMatcher, orchestrator: Arc<ExecutionOrchestrator>) -> Self {
        Self {
            matcher,
            orchestrator,
        }
    }

    pub fn orchestrator(&self) -> &Arc<ExecutionOrchestrator> {
        &self.orchestrator
    }

    /// Start one execution per matching workflow without waiting for them
    #[instrument(skip(self, event), fields(event_id = %event.id, category = %event.category))]
    pub async fn ingest(&self, event: &UserEvent) -> Result<IngestReceipt, WorkflowError> {
        let dispatches = self.dispatch(event).await?;

        Ok(IngestReceipt {
            event_id: event.id.clone(),
            matched_workflows: dispatches.into_iter().map(|d| d.workflow_id).collect(),
        })
    }

    /// Start one execution per matching workflow and wait for all of them
    pub async fn ingest_and_wait(
        &self,
        event: &UserEvent,
    ) -> Result<Vec<DispatchResult>, WorkflowError> {
        let (workflow_ids, handles): (Vec<_>, Vec<_>) = self
            .dispatch(event)
            .await?
            .into_iter()
            .map(|dispatch| (dispatch.workflow_id, dispatch.handle))
            .unzip();

        let results = join_all(handles)
            .await
            .into_iter()
            .zip(workflow_ids)
            .map(|(joined, workflow_id)| DispatchResult {
                workflow_id,
                outcome: joined.unwrap_or_else(|e| {
                    Err(WorkflowError::store(format!("execution task failed: {}", e)))
                }),
            })
            .collect();

        Ok(results)
    }

    /// Match the event and spawn the executions
    pub async fn dispatch(&self, event: &UserEvent) -> Result<Vec<Dispatch>, WorkflowError> {
        let snapshot = event.snapshot();
        let workflows = self.matcher.find_matching(&snapshot).await?;

        if workflows.is_empty() {
            info!(event_id = %event.id, "No workflow matched event");
            return Ok(Vec::new());
        }

        info!(
            event_id = %event.id,
            matched = workflows.len(),
            "Dispatching event to workflows"
        );

        let dispatches = workflows
            .into_iter()
            .map(|workflow| {
                let orchestrator = self.orchestrator.clone();
                let event = snapshot.clone();
                let workflow_id = workflow.id().clone();

                let handle = tokio::spawn(async move {
                    let result = orchestrator.execute(&workflow, event).await;
                    if let Err(e) = &result {
                        error!(workflow_id = %workflow.id(), error = %e, "Execution could not run");
                    }
                    result
                });

                Dispatch {
                    workflow_id,
                    handle,
                }
            })
            .collect();

        Ok(dispatches)
    }
}
