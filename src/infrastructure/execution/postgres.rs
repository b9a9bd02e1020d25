//! PostgreSQL execution store
//!
//! Executions and steps are kept in the relational `workflow_executions` /
//! `workflow_steps` tables created by the storage migrations. Each mutating
//! call runs in its own transaction and locks the execution row, which
//! serializes step ordering per execution without blocking other runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, Row, Transaction};
use uuid::Uuid;

use crate::domain::DomainError;
use crate::domain::execution::{
    ExecutionId, ExecutionMetrics, ExecutionOutcome, ExecutionStatus, ExecutionStore, NewStep,
    StepPatch, WorkflowExecution, WorkflowStep,
};
use crate::domain::workflow::WorkflowId;

const EXECUTION_COLUMNS: &str = "id, workflow_id, status, trigger_event, metrics, error_summary, \
     result, cancel_requested, started_at, completed_at";

const STEP_COLUMNS: &str = "id, execution_id, step_order, step_type, node_id, node_type, status, \
     started_at, ended_at, duration_ms, input, output, error";

#[derive(Debug, Clone)]
pub struct PostgresExecutionStore {
    pool: PgPool,
}

impl PostgresExecutionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> Result<Transaction<'_, Postgres>, DomainError> {
        self.pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))
    }

    /// Lock the execution row and fail unless it is still running
    async fn lock_running(
        tx: &mut Transaction<'_, Postgres>,
        execution_id: &ExecutionId,
    ) -> Result<(), DomainError> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM workflow_executions WHERE id = $1 FOR UPDATE")
                .bind(execution_id.as_uuid())
                .fetch_optional(&mut **tx)
                .await
                .map_err(|e| db_error("lock execution", e))?;

        let status: ExecutionStatus = status
            .ok_or_else(|| DomainError::not_found(format!("Execution '{}' not found", execution_id)))?
            .parse()?;

        if status.is_terminal() {
            return Err(DomainError::conflict(format!(
                "Execution '{}' is already {}",
                execution_id,
                status.as_str()
            )));
        }
        Ok(())
    }

    async fn fetch_step(
        tx: &mut Transaction<'_, Postgres>,
        execution_id: &ExecutionId,
        step_order: u32,
    ) -> Result<WorkflowStep, DomainError> {
        let query = format!(
            "SELECT {} FROM workflow_steps WHERE execution_id = $1 AND step_order = $2",
            STEP_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(execution_id.as_uuid())
            .bind(step_order as i32)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| db_error("load step", e))?
            .ok_or_else(|| {
                DomainError::not_found(format!(
                    "Step {} of execution '{}' not found",
                    step_order, execution_id
                ))
            })?;

        step_from_row(&row)
    }
}

fn db_error(action: &str, error: sqlx::Error) -> DomainError {
    DomainError::storage(format!("Failed to {}: {}", action, error))
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, DomainError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| DomainError::storage(format!("Failed to read column '{}': {}", name, e)))
}

fn execution_from_row(row: &PgRow) -> Result<WorkflowExecution, DomainError> {
    let workflow_id: String = column(row, "workflow_id")?;
    let status: String = column(row, "status")?;
    let metrics: Option<Value> = column(row, "metrics")?;

    Ok(WorkflowExecution {
        id: ExecutionId::from(column::<Uuid>(row, "id")?),
        workflow_id: WorkflowId::new(workflow_id)?,
        status: status.parse()?,
        trigger_event: column(row, "trigger_event")?,
        metrics: metrics
            .map(serde_json::from_value::<ExecutionMetrics>)
            .transpose()
            .map_err(|e| DomainError::storage(format!("Invalid metrics document: {}", e)))?,
        error_summary: column(row, "error_summary")?,
        result: column(row, "result")?,
        cancel_requested: column(row, "cancel_requested")?,
        started_at: column(row, "started_at")?,
        completed_at: column(row, "completed_at")?,
    })
}

fn step_from_row(row: &PgRow) -> Result<WorkflowStep, DomainError> {
    let step_type: String = column(row, "step_type")?;
    let status: String = column(row, "status")?;
    let step_order: i32 = column(row, "step_order")?;
    let duration_ms: Option<i64> = column(row, "duration_ms")?;

    Ok(WorkflowStep {
        id: column(row, "id")?,
        execution_id: ExecutionId::from(column::<Uuid>(row, "execution_id")?),
        step_order: step_order as u32,
        step_type: step_type.parse()?,
        node_id: column(row, "node_id")?,
        node_type: column(row, "node_type")?,
        status: status.parse()?,
        started_at: column(row, "started_at")?,
        ended_at: column(row, "ended_at")?,
        duration_ms: duration_ms.map(|ms| ms.max(0) as u64),
        input: column(row, "input")?,
        output: column(row, "output")?,
        error: column(row, "error")?,
    })
}

#[async_trait]
impl ExecutionStore for PostgresExecutionStore {
    async fn create_execution(
        &self,
        workflow_id: &WorkflowId,
        trigger_event: Value,
    ) -> Result<WorkflowExecution, DomainError> {
        let execution = WorkflowExecution::start(workflow_id.clone(), trigger_event);

        sqlx::query(
            "INSERT INTO workflow_executions (id, workflow_id, status, trigger_event, started_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(execution.id.as_uuid())
        .bind(execution.workflow_id.as_str())
        .bind(execution.status.as_str())
        .bind(&execution.trigger_event)
        .bind(execution.started_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("create execution", e))?;

        Ok(execution)
    }

    async fn append_step(
        &self,
        execution_id: &ExecutionId,
        step: NewStep,
    ) -> Result<WorkflowStep, DomainError> {
        let mut tx = self.begin().await?;
        Self::lock_running(&mut tx, execution_id).await?;

        let next: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(step_order), 0) + 1 FROM workflow_steps WHERE execution_id = $1",
        )
        .bind(execution_id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("allocate step order", e))?;

        let step = WorkflowStep::from_new(*execution_id, next as u32, step);
        sqlx::query(
            "INSERT INTO workflow_steps (id, execution_id, step_order, step_type, node_id, \
             node_type, status, started_at, input, error) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(step.id)
        .bind(execution_id.as_uuid())
        .bind(next)
        .bind(step.step_type.as_str())
        .bind(&step.node_id)
        .bind(&step.node_type)
        .bind(step.status.as_str())
        .bind(step.started_at)
        .bind(&step.input)
        .bind(&step.error)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("append step", e))?;

        tx.commit().await.map_err(|e| db_error("commit step", e))?;
        Ok(step)
    }

    async fn update_step(
        &self,
        execution_id: &ExecutionId,
        step_order: u32,
        patch: StepPatch,
    ) -> Result<WorkflowStep, DomainError> {
        let mut tx = self.begin().await?;
        Self::lock_running(&mut tx, execution_id).await?;

        let mut step = Self::fetch_step(&mut tx, execution_id, step_order).await?;
        step.apply(patch);

        sqlx::query(
            "UPDATE workflow_steps SET status = $3, ended_at = $4, duration_ms = $5, \
             input = $6, output = $7, error = $8 \
             WHERE execution_id = $1 AND step_order = $2",
        )
        .bind(execution_id.as_uuid())
        .bind(step_order as i32)
        .bind(step.status.as_str())
        .bind(step.ended_at)
        .bind(step.duration_ms.map(|ms| ms as i64))
        .bind(&step.input)
        .bind(&step.output)
        .bind(&step.error)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("update step", e))?;

        tx.commit().await.map_err(|e| db_error("commit step", e))?;
        Ok(step)
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

        let mut tx = self.begin().await?;
        Self::lock_running(&mut tx, execution_id).await?;

        let metrics = serde_json::to_value(&outcome.metrics)
            .map_err(|e| DomainError::internal(format!("Failed to encode metrics: {}", e)))?;
        let completed_at: DateTime<Utc> = Utc::now();

        let query = format!(
            "UPDATE workflow_executions SET status = $2, metrics = $3, error_summary = $4, \
             result = $5, completed_at = $6 WHERE id = $1 RETURNING {}",
            EXECUTION_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(execution_id.as_uuid())
            .bind(outcome.status.as_str())
            .bind(metrics)
            .bind(&outcome.error_summary)
            .bind(&outcome.result)
            .bind(completed_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| db_error("finalize execution", e))?;

        tx.commit().await.map_err(|e| db_error("commit execution", e))?;
        execution_from_row(&row)
    }

    async fn get_execution(
        &self,
        execution_id: &ExecutionId,
    ) -> Result<Option<WorkflowExecution>, DomainError> {
        let query = format!("SELECT {} FROM workflow_executions WHERE id = $1", EXECUTION_COLUMNS);

        sqlx::query(&query)
            .bind(execution_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("get execution", e))?
            .as_ref()
            .map(execution_from_row)
            .transpose()
    }

    async fn list_steps(&self, execution_id: &ExecutionId) -> Result<Vec<WorkflowStep>, DomainError> {
        let query = format!(
            "SELECT {} FROM workflow_steps WHERE execution_id = $1 ORDER BY step_order",
            STEP_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(execution_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list steps", e))?;

        rows.iter().map(step_from_row).collect()
    }

    async fn list_executions(
        &self,
        workflow_id: &WorkflowId,
        limit: usize,
    ) -> Result<Vec<WorkflowExecution>, DomainError> {
        let query = format!(
            "SELECT {} FROM workflow_executions WHERE workflow_id = $1 \
             ORDER BY started_at DESC LIMIT $2",
            EXECUTION_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(workflow_id.as_str())
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list executions", e))?;

        rows.iter().map(execution_from_row).collect()
    }

    async fn last_completed_execution(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<Option<WorkflowExecution>, DomainError> {
        let query = format!(
            "SELECT {} FROM workflow_executions WHERE workflow_id = $1 AND status = 'completed' \
             ORDER BY completed_at DESC LIMIT 1",
            EXECUTION_COLUMNS
        );

        sqlx::query(&query)
            .bind(workflow_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("load last completed execution", e))?
            .as_ref()
            .map(execution_from_row)
            .transpose()
    }

    async fn request_cancellation(&self, execution_id: &ExecutionId) -> Result<bool, DomainError> {
        let result = sqlx::query(
            "UPDATE workflow_executions SET cancel_requested = TRUE \
             WHERE id = $1 AND status = 'running'",
        )
        .bind(execution_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("request cancellation", e))?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        match self.get_execution(execution_id).await? {
            Some(_) => Ok(false),
            None => Err(DomainError::not_found(format!(
                "Execution '{}' not found",
                execution_id
            ))),
        }
    }

    async fn is_cancellation_requested(
        &self,
        execution_id: &ExecutionId,
    ) -> Result<bool, DomainError> {
        let flag: Option<bool> =
            sqlx::query_scalar("SELECT cancel_requested FROM workflow_executions WHERE id = $1")
                .bind(execution_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("read cancellation flag", e))?;

        flag.ok_or_else(|| DomainError::not_found(format!("Execution '{}' not found", execution_id)))
    }
}
