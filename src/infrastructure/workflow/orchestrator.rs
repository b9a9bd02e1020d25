//! Execution orchestrator
//!
//! Runs one workflow for one event as a sequential pipeline:
//!
//! 1. a `trigger_validation` step checks the event against the trigger;
//! 2. the connected sequence is walked from the trigger, following the first
//!    outgoing edge of ordinary nodes and the selected branch of condition
//!    nodes, until a dead end or an already visited node;
//! 3. nodes the walk never reached run afterwards, in declaration order.
//!
//! A failed step is recorded and the walk goes on. The execution completes
//! only if every step succeeded. Cancellation requests and the optional
//! execution deadline are checked between steps; the nodes not yet run are
//! then recorded as skipped.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use crate::domain::execution::{
    ExecutionId, ExecutionMetrics, ExecutionOutcome, ExecutionStatus, ExecutionStore, NewStep,
    StepPatch, StepStatus, StepType, WorkflowExecution, WorkflowStep,
};
use crate::domain::workflow::{
    ActionNode, ConditionEvaluator, ConditionNode, DataResolver, ExecutionContext,
    ExecutionHistory, NodeIndex, NodeKind, Workflow, WorkflowError, WorkflowGraph,
};
use crate::infrastructure::action::ActionExecutorRegistry;
use crate::infrastructure::observability::{record_execution, record_step};

use super::events::{ExecutionEvent, ExecutionEventHub};

/// Configuration for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Wall-clock budget of one execution, checked between steps
    pub execution_deadline: Option<Duration>,

    /// Expose the last completed execution under `execution.*`
    pub history_lookup: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            execution_deadline: None,
            history_lookup: true,
        }
    }
}

impl OrchestratorConfig {
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.execution_deadline = Some(deadline);
        self
    }

    pub fn with_history_lookup(mut self, enabled: bool) -> Self {
        self.history_lookup = enabled;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum StopReason {
    Cancelled,
    DeadlineExceeded(Duration),
}

impl StopReason {
    fn describe(&self) -> String {
        match self {
            Self::Cancelled => "execution cancelled".to_string(),
            Self::DeadlineExceeded(limit) => {
                format!("execution deadline of {}ms exceeded", limit.as_millis())
            }
        }
    }
}

/// What the pipeline left behind for finalization
struct RunOutcome {
    context: Option<ExecutionContext>,
    stop: Option<StopReason>,
}

/// Per-execution bookkeeping
struct Run {
    execution_id: ExecutionId,
    started: Instant,
    deadline: Option<(Instant, Duration)>,
}

pub struct ExecutionOrchestrator {
    store: Arc<dyn ExecutionStore>,
    registry: Arc<ActionExecutorRegistry>,
    events: Arc<ExecutionEventHub>,
    config: OrchestratorConfig,
}

impl std::fmt::Debug for ExecutionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionOrchestrator")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ExecutionOrchestrator {
    pub fn new(store: Arc<dyn ExecutionStore>, registry: Arc<ActionExecutorRegistry>) -> Self {
        Self {
            store,
            registry,
            events: Arc::new(ExecutionEventHub::default()),
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_events(mut self, events: Arc<ExecutionEventHub>) -> Self {
        self.events = events;
        self
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &Arc<dyn ExecutionStore> {
        &self.store
    }

    pub fn events(&self) -> &Arc<ExecutionEventHub> {
        &self.events
    }

    /// Run `workflow` for the event snapshot `event`.
    ///
    /// Step failures are part of the returned execution. `Err` means the
    /// workflow was not runnable or the store failed.
    #[instrument(skip(self, workflow, event), fields(workflow_id = %workflow.id()))]
    pub async fn execute(
        &self,
        workflow: &Workflow,
        event: Value,
    ) -> Result<WorkflowExecution, WorkflowError> {
        if !workflow.is_active() {
            return Err(WorkflowError::inactive(workflow.id().as_str()));
        }

        let execution = self.store.create_execution(workflow.id(), event.clone()).await?;
        info!(execution_id = %execution.id, "Execution started");
        self.events.publish(ExecutionEvent::ExecutionStarted {
            execution_id: execution.id,
            workflow_id: workflow.id().clone(),
        });

        let started = Instant::now();
        let run = Run {
            execution_id: execution.id,
            started,
            deadline: self
                .config
                .execution_deadline
                .map(|limit| (started + limit, limit)),
        };

        match self.run(workflow, event, &run).await {
            Ok(outcome) => self.finalize(workflow, &run, outcome).await,
            Err(error) => {
                self.abort(workflow, &run, &error).await;
                Err(error)
            }
        }
    }

    /// Ask a running execution to stop at its next step boundary
    pub async fn request_cancellation(
        &self,
        execution_id: &ExecutionId,
    ) -> Result<bool, WorkflowError> {
        let accepted = self.store.request_cancellation(execution_id).await?;
        info!(execution_id = %execution_id, accepted, "Cancellation requested");
        Ok(accepted)
    }

    async fn run(
        &self,
        workflow: &Workflow,
        event: Value,
        run: &Run,
    ) -> Result<RunOutcome, WorkflowError> {
        let graph = WorkflowGraph::new(workflow);

        let Some(trigger) = self.validate_trigger(workflow, &graph, &event, run).await? else {
            return Ok(RunOutcome {
                context: None,
                stop: None,
            });
        };

        let history = self.load_history(workflow).await;
        let mut context = ExecutionContext::new(event).with_history(history);
        let mut evaluators: HashMap<NodeIndex, ConditionEvaluator> = HashMap::new();
        let mut visited: HashSet<NodeIndex> = HashSet::from([trigger]);

        let mut cursor = graph.next_linear(trigger);
        while let Some(index) = cursor {
            if visited.contains(&index) {
                warn!(
                    execution_id = %run.execution_id,
                    node_id = graph.node(index).id(),
                    "Cycle detected, stopping traversal"
                );
                break;
            }

            if let Some(stop) = self.stop_reason(run).await? {
                let mut remaining = graph.linear_walk(index, &visited);
                let mut seen = visited.clone();
                seen.extend(remaining.iter().copied());
                remaining.extend(graph.disconnected_tail(&seen));

                self.skip_nodes(run, &graph, &remaining, stop).await?;
                return Ok(RunOutcome {
                    context: Some(context),
                    stop: Some(stop),
                });
            }

            visited.insert(index);
            let branch = self
                .run_node(run, graph.node(index), index, &mut context, &mut evaluators)
                .await?;

            cursor = match branch {
                Some(label) => {
                    let next = graph.next_for_branch(index, &label);
                    if next.is_none() {
                        debug!(branch = %label, "Selected branch has no outgoing edge");
                    }
                    next
                }
                None => graph.next_linear(index),
            };
        }

        let tail = graph.disconnected_tail(&visited);
        if !tail.is_empty() {
            info!(
                execution_id = %run.execution_id,
                count = tail.len(),
                "Running nodes not connected to the trigger"
            );
        }

        for (position, &index) in tail.iter().enumerate() {
            if let Some(stop) = self.stop_reason(run).await? {
                self.skip_nodes(run, &graph, &tail[position..], stop).await?;
                return Ok(RunOutcome {
                    context: Some(context),
                    stop: Some(stop),
                });
            }

            // branches of a disconnected condition are not followed
            self.run_node(run, graph.node(index), index, &mut context, &mut evaluators)
                .await?;
        }

        Ok(RunOutcome {
            context: Some(context),
            stop: None,
        })
    }

    /// Record the `trigger_validation` step; the trigger index if it passed
    async fn validate_trigger(
        &self,
        workflow: &Workflow,
        graph: &WorkflowGraph<'_>,
        event: &Value,
        run: &Run,
    ) -> Result<Option<NodeIndex>, WorkflowError> {
        let mut new_step = NewStep::running(StepType::TriggerValidation)
            .with_input(serde_json::to_value(workflow.trigger()).unwrap_or(Value::Null));
        if let Some(trigger) = graph.trigger() {
            new_step = new_step.for_node(graph.node(trigger).id(), "trigger");
        }

        let step = self.open_step(run, new_step).await?;
        let timer = Instant::now();

        let failure = match graph.trigger() {
            None => Some(WorkflowError::missing_trigger(workflow.id().as_str()).to_string()),
            Some(_) => workflow.trigger().mismatch_reason(event),
        };

        match (graph.trigger(), failure) {
            (Some(trigger), None) => {
                let output = json!({
                    "matched": true,
                    "triggerNodeId": graph.node(trigger).id(),
                });
                self.close_step(&step, StepPatch::completed(output, elapsed_ms(timer)))
                    .await?;
                Ok(Some(trigger))
            }
            (_, failure) => {
                let reason = failure.unwrap_or_default();
                warn!(execution_id = %run.execution_id, reason = %reason, "Trigger validation failed");
                self.close_step(&step, StepPatch::failed(reason, elapsed_ms(timer)))
                    .await?;
                Ok(None)
            }
        }
    }

    async fn load_history(&self, workflow: &Workflow) -> ExecutionHistory {
        if !self.config.history_lookup {
            return ExecutionHistory::default();
        }

        match self.store.last_completed_execution(workflow.id()).await {
            Ok(Some(previous)) => ExecutionHistory {
                last_execution_id: Some(previous.id.to_string()),
                last_completed_at: previous.completed_at,
                last_result: previous.result,
            },
            Ok(None) => ExecutionHistory::default(),
            Err(e) => {
                warn!(error = %e, "Could not load execution history, continuing without it");
                ExecutionHistory::default()
            }
        }
    }

    async fn stop_reason(&self, run: &Run) -> Result<Option<StopReason>, WorkflowError> {
        if self.store.is_cancellation_requested(&run.execution_id).await? {
            return Ok(Some(StopReason::Cancelled));
        }

        if let Some((deadline, limit)) = run.deadline {
            if Instant::now() >= deadline {
                return Ok(Some(StopReason::DeadlineExceeded(limit)));
            }
        }

        Ok(None)
    }

    /// Execute one node; returns the selected branch for condition nodes
    async fn run_node(
        &self,
        run: &Run,
        node: &ActionNode,
        index: NodeIndex,
        context: &mut ExecutionContext,
        evaluators: &mut HashMap<NodeIndex, ConditionEvaluator>,
    ) -> Result<Option<String>, WorkflowError> {
        match node.kind() {
            NodeKind::Condition(condition) => {
                let evaluator = evaluators
                    .entry(index)
                    .or_insert_with(|| ConditionEvaluator::compile(condition));
                self.run_condition(run, node, condition, evaluator, context)
                    .await
                    .map(Some)
            }
            NodeKind::Trigger => {
                let step = NewStep::skipped(
                    StepType::DataProcessing,
                    "only the first trigger node is evaluated",
                )
                .for_node(node.id(), node.kind().type_name());
                self.append_finished(run, step).await?;
                Ok(None)
            }
            NodeKind::PromoCode(_) | NodeKind::PushNotification(_) | NodeKind::Message(_) => {
                self.run_action(run, node, context).await?;
                Ok(None)
            }
        }
    }

    async fn run_condition(
        &self,
        run: &Run,
        node: &ActionNode,
        condition: &ConditionNode,
        evaluator: &ConditionEvaluator,
        context: &mut ExecutionContext,
    ) -> Result<String, WorkflowError> {
        let step = self
            .open_step(
                run,
                NewStep::running(StepType::DataProcessing).for_node(node.id(), "condition"),
            )
            .await?;
        let timer = Instant::now();

        let outcome = evaluator.evaluate(&DataResolver::new(context));
        let output = serde_json::to_value(&outcome).unwrap_or(Value::Null);
        let input = json!({
            "branches": condition.branches,
            "elseLabel": condition.else_label,
        });

        debug!(
            node_id = node.id(),
            branch = %outcome.selected_branch,
            "Condition evaluated"
        );

        if let Some(variable) = node.output_variable() {
            context.set(variable, output.clone());
        }

        let mut patch = StepPatch::completed(output, elapsed_ms(timer)).with_input(input);
        let errors = outcome.errors();
        if !errors.is_empty() {
            warn!(node_id = node.id(), errors = ?errors, "Branch predicates failed and were treated as false");
            patch.error = Some(errors.join("; "));
        }

        self.close_step(&step, patch).await?;
        Ok(outcome.selected_branch)
    }

    async fn run_action(
        &self,
        run: &Run,
        node: &ActionNode,
        context: &mut ExecutionContext,
    ) -> Result<(), WorkflowError> {
        let step = self
            .open_step(
                run,
                NewStep::running(StepType::ActionExecution)
                    .for_node(node.id(), node.kind().type_name()),
            )
            .await?;
        let timer = Instant::now();

        let input = node.kind().resolve_input(&DataResolver::new(context));
        let Some(input) = input else {
            let patch = StepPatch::failed("node has no executable action", elapsed_ms(timer));
            self.close_step(&step, patch).await?;
            return Ok(());
        };
        let snapshot = input.snapshot();

        let patch = match self.registry.execute(&input).await {
            Ok(output) => {
                if let Some(variable) = node.output_variable() {
                    if context.set(variable, output.clone()).is_some() {
                        debug!(variable, node_id = node.id(), "Output variable overwritten");
                    }
                }
                StepPatch::completed(output, elapsed_ms(timer))
            }
            Err(e) => {
                warn!(
                    execution_id = %run.execution_id,
                    node_id = node.id(),
                    category = e.category(),
                    error = %e,
                    "Action failed"
                );
                StepPatch::failed(format!("{}: {}", e.category(), e), elapsed_ms(timer))
            }
        };

        self.close_step(&step, patch.with_input(snapshot)).await?;
        Ok(())
    }

    async fn skip_nodes(
        &self,
        run: &Run,
        graph: &WorkflowGraph<'_>,
        nodes: &[NodeIndex],
        stop: StopReason,
    ) -> Result<(), WorkflowError> {
        info!(
            execution_id = %run.execution_id,
            skipped = nodes.len(),
            reason = %stop.describe(),
            "Stopping execution"
        );

        for &index in nodes {
            let node = graph.node(index);
            let step = NewStep::skipped(step_type_of(node), stop.describe())
                .for_node(node.id(), node.kind().type_name());
            self.append_finished(run, step).await?;
        }
        Ok(())
    }

    async fn open_step(&self, run: &Run, step: NewStep) -> Result<WorkflowStep, WorkflowError> {
        let step = self.store.append_step(&run.execution_id, step).await?;
        self.events.publish(ExecutionEvent::StepStarted {
            execution_id: run.execution_id,
            step_order: step.step_order,
            step_type: step.step_type,
            node_id: step.node_id.clone(),
        });
        Ok(step)
    }

    async fn close_step(
        &self,
        step: &WorkflowStep,
        patch: StepPatch,
    ) -> Result<WorkflowStep, WorkflowError> {
        let step = self
            .store
            .update_step(&step.execution_id, step.step_order, patch)
            .await?;
        self.publish_finished(&step);
        Ok(step)
    }

    /// Append a step that is already finished, e.g. skipped
    async fn append_finished(&self, run: &Run, step: NewStep) -> Result<(), WorkflowError> {
        let step = self.store.append_step(&run.execution_id, step).await?;
        self.publish_finished(&step);
        Ok(())
    }

    fn publish_finished(&self, step: &WorkflowStep) {
        record_step(
            step.step_type.as_str(),
            step.status.as_str(),
            Duration::from_millis(step.duration_ms.unwrap_or_default()),
        );
        self.events.publish(ExecutionEvent::StepFinished {
            execution_id: step.execution_id,
            step_order: step.step_order,
            status: step.status,
            duration_ms: step.duration_ms,
        });
    }

    async fn finalize(
        &self,
        workflow: &Workflow,
        run: &Run,
        outcome: RunOutcome,
    ) -> Result<WorkflowExecution, WorkflowError> {
        let steps = self.store.list_steps(&run.execution_id).await?;
        let elapsed = run.started.elapsed();
        let failures = failure_summary(&steps);

        let (status, error_summary) = match outcome.stop {
            Some(stop) => {
                let status = match stop {
                    StopReason::Cancelled => ExecutionStatus::Cancelled,
                    StopReason::DeadlineExceeded(_) => ExecutionStatus::Failed,
                };
                let summary = match failures {
                    Some(failures) => format!("{}; {}", stop.describe(), failures),
                    None => stop.describe(),
                };
                (status, Some(summary))
            }
            None => match failures {
                None => (ExecutionStatus::Completed, None),
                Some(failures) => (ExecutionStatus::Failed, Some(failures)),
            },
        };

        let execution = self
            .store
            .finalize_execution(
                &run.execution_id,
                ExecutionOutcome {
                    status,
                    metrics: ExecutionMetrics::from_steps(&steps, elapsed.as_millis() as u64),
                    error_summary,
                    result: outcome.context.map(ExecutionContext::into_result),
                },
            )
            .await?;

        self.finish(workflow, &execution, elapsed);
        Ok(execution)
    }

    /// Best-effort finalization after a store failure
    async fn abort(&self, workflow: &Workflow, run: &Run, error: &WorkflowError) {
        let steps = self
            .store
            .list_steps(&run.execution_id)
            .await
            .unwrap_or_default();
        let elapsed = run.started.elapsed();
        let outcome = ExecutionOutcome {
            status: ExecutionStatus::Failed,
            metrics: ExecutionMetrics::from_steps(&steps, elapsed.as_millis() as u64),
            error_summary: Some(format!("execution aborted: {}", error)),
            result: None,
        };

        match self.store.finalize_execution(&run.execution_id, outcome).await {
            Ok(execution) => self.finish(workflow, &execution, elapsed),
            Err(e) => warn!(
                execution_id = %run.execution_id,
                error = %e,
                "Could not finalize aborted execution"
            ),
        }
    }

    fn finish(&self, workflow: &Workflow, execution: &WorkflowExecution, elapsed: Duration) {
        record_execution(execution.status.as_str(), elapsed);
        self.events.publish(ExecutionEvent::ExecutionFinished {
            execution_id: execution.id,
            workflow_id: workflow.id().clone(),
            status: execution.status,
        });
        info!(
            execution_id = %execution.id,
            status = execution.status.as_str(),
            duration_ms = elapsed.as_millis() as u64,
            "Execution finished"
        );
    }
}

fn step_type_of(node: &ActionNode) -> StepType {
    match node.kind() {
        NodeKind::Trigger | NodeKind::Condition(_) => StepType::DataProcessing,
        _ => StepType::ActionExecution,
    }
}

fn elapsed_ms(timer: Instant) -> u64 {
    timer.elapsed().as_millis() as u64
}

/// `"1 of 3 steps failed: step 2 (node 'sms'): ..."`, `None` if nothing failed
fn failure_summary(steps: &[WorkflowStep]) -> Option<String> {
    let failed: Vec<String> = steps
        .iter()
        .filter(|s| s.status == StepStatus::Failed)
        .map(|s| {
            format!(
                "step {} (node '{}'): {}",
                s.step_order,
                s.node_id.as_deref().unwrap_or("-"),
                s.error.as_deref().unwrap_or("unknown error")
            )
        })
        .collect();

    if failed.is_empty() {
        return None;
    }

    Some(format!(
        "{} of {} steps failed: {}",
        failed.len(),
        steps.len(),
        failed.join("; ")
    ))
}
