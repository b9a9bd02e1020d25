//! Execution and step records

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::DomainError;
use crate::domain::workflow::WorkflowId;

/// Identifier of one workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(Uuid);

impl ExecutionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ExecutionId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::invalid_id(format!("Invalid execution ID '{}': {}", s, e)))
    }
}

impl From<Uuid> for ExecutionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of an execution: `running` until one terminal state is set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for ExecutionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(DomainError::validation(format!(
                "Unknown execution status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    TriggerValidation,
    ActionExecution,
    DataProcessing,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TriggerValidation => "trigger_validation",
            Self::ActionExecution => "action_execution",
            Self::DataProcessing => "data_processing",
        }
    }
}

impl FromStr for StepType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trigger_validation" => Ok(Self::TriggerValidation),
            "action_execution" => Ok(Self::ActionExecution),
            "data_processing" => Ok(Self::DataProcessing),
            other => Err(DomainError::validation(format!("Unknown step type '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }
}

impl FromStr for StepStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "skipped" => Ok(Self::Skipped),
            other => Err(DomainError::validation(format!("Unknown step status '{}'", other))),
        }
    }
}

/// Aggregate timings stored when an execution is finalized
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionMetrics {
    pub total_duration_ms: u64,
    pub step_count: u32,
    pub succeeded_steps: u32,
    pub failed_steps: u32,
    pub skipped_steps: u32,
}

impl ExecutionMetrics {
    pub fn from_steps(steps: &[WorkflowStep], total_duration_ms: u64) -> Self {
        let count = |status: StepStatus| steps.iter().filter(|s| s.status == status).count() as u32;

        Self {
            total_duration_ms,
            step_count: steps.len() as u32,
            succeeded_steps: count(StepStatus::Completed),
            failed_steps: count(StepStatus::Failed),
            skipped_steps: count(StepStatus::Skipped),
        }
    }
}

/// One run of a workflow in response to one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowExecution {
    pub id: ExecutionId,
    pub workflow_id: WorkflowId,
    pub status: ExecutionStatus,
    pub trigger_event: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ExecutionMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_summary: Option<String>,
    /// Final context variables, set on finalize
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default)]
    pub cancel_requested: bool,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkflowExecution {
    pub fn start(workflow_id: WorkflowId, trigger_event: Value) -> Self {
        Self {
            id: ExecutionId::new(),
            workflow_id,
            status: ExecutionStatus::Running,
            trigger_event,
            metrics: None,
            error_summary: None,
            result: None,
            cancel_requested: false,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Recorded outcome of one node within one execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    pub id: Uuid,
    pub execution_id: ExecutionId,
    /// Strictly increasing within an execution, starting at 1
    pub step_order: u32,
    pub step_type: StepType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowStep {
    /// Materialize a new step; the store picks the order
    pub fn from_new(execution_id: ExecutionId, step_order: u32, new: NewStep) -> Self {
        let started_at = matches!(new.status, StepStatus::Running).then(Utc::now);

        Self {
            id: Uuid::new_v4(),
            execution_id,
            step_order,
            step_type: new.step_type,
            node_id: new.node_id,
            node_type: new.node_type,
            status: new.status,
            started_at,
            ended_at: None,
            duration_ms: None,
            input: new.input,
            output: None,
            error: new.error,
        }
    }

    pub fn apply(&mut self, patch: StepPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if patch.ended_at.is_some() {
            self.ended_at = patch.ended_at;
        }
        if patch.duration_ms.is_some() {
            self.duration_ms = patch.duration_ms;
        }
        if patch.input.is_some() {
            self.input = patch.input;
        }
        if patch.output.is_some() {
            self.output = patch.output;
        }
        if patch.error.is_some() {
            self.error = patch.error;
        }
    }
}

/// Data for appending a step
#[derive(Debug, Clone, PartialEq)]
pub struct NewStep {
    pub step_type: StepType,
    pub node_id: Option<String>,
    pub node_type: Option<String>,
    pub status: StepStatus,
    pub input: Option<Value>,
    pub error: Option<String>,
}

impl NewStep {
    /// A step that starts running now
    pub fn running(step_type: StepType) -> Self {
        Self {
            step_type,
            node_id: None,
            node_type: None,
            status: StepStatus::Running,
            input: None,
            error: None,
        }
    }

    /// A step recorded without running, e.g. after cancellation
    pub fn skipped(step_type: StepType, reason: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Skipped,
            error: Some(reason.into()),
            ..Self::running(step_type)
        }
    }

    pub fn for_node(mut self, node_id: impl Into<String>, node_type: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self.node_type = Some(node_type.into());
        self
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }
}

/// Partial update of a step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepPatch {
    pub status: Option<StepStatus>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub input: Option<Value>,
    pub output: Option<Value>,
    pub error: Option<String>,
}

impl StepPatch {
    pub fn completed(output: Value, duration_ms: u64) -> Self {
        Self {
            status: Some(StepStatus::Completed),
            ended_at: Some(Utc::now()),
            duration_ms: Some(duration_ms),
            output: Some(output),
            ..Self::default()
        }
    }

    pub fn failed(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            status: Some(StepStatus::Failed),
            ended_at: Some(Utc::now()),
            duration_ms: Some(duration_ms),
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_output(mut self, output: Value) -> Self {
        self.output = Some(output);
        self
    }
}

/// Terminal state written by `finalize_execution`
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub status: ExecutionStatus,
    pub metrics: ExecutionMetrics,
    pub error_summary: Option<String>,
    pub result: Option<Value>,
}
