//! Workflow definition endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::workflow::{Workflow, WorkflowId};
use crate::domain::execution::WorkflowExecution;
use crate::infrastructure::services::{
    CreateWorkflowRequest, UpdateWorkflowRequest, ValidationReport,
};

const DEFAULT_EXECUTION_PAGE: usize = 50;

#[derive(Debug, Serialize)]
pub struct WorkflowListResponse {
    pub workflows: Vec<Workflow>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct ExecutionListQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionListResponse {
    pub workflow_id: String,
    pub executions: Vec<WorkflowExecution>,
}

/// GET /v1/workflows
pub async fn list_workflows(
    State(state): State<AppState>,
) -> Result<Json<WorkflowListResponse>, ApiError> {
    let workflows = state.workflow_service.list().await?;
    let total = workflows.len();
    Ok(Json(WorkflowListResponse { workflows, total }))
}

/// POST /v1/workflows
pub async fn create_workflow(
    State(state): State<AppState>,
    Json(request): Json<CreateWorkflowRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let workflow = state.workflow_service.create(request).await?;
    Ok((StatusCode::CREATED, Json(workflow)))
}

/// GET /v1/workflows/{workflow_id}
pub async fn get_workflow(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
) -> Result<Json<Workflow>, ApiError> {
    state
        .workflow_service
        .get(&workflow_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Workflow '{}' not found", workflow_id)))
}

/// PUT /v1/workflows/{workflow_id}
pub async fn update_workflow(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
    Json(request): Json<UpdateWorkflowRequest>,
) -> Result<Json<Workflow>, ApiError> {
    let workflow = state.workflow_service.update(&workflow_id, request).await?;
    Ok(Json(workflow))
}

/// DELETE /v1/workflows/{workflow_id}
pub async fn delete_workflow(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.workflow_service.delete(&workflow_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!(
            "Workflow '{}' not found",
            workflow_id
        )))
    }
}

/// POST /v1/workflows/{workflow_id}/validate
pub async fn validate_workflow(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
) -> Result<Json<ValidationReport>, ApiError> {
    let report = state.workflow_service.validate(&workflow_id).await?;
    Ok(Json(report))
}

/// GET /v1/workflows/{workflow_id}/executions?limit=N
pub async fn list_workflow_executions(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
    Query(query): Query<ExecutionListQuery>,
) -> Result<Json<ExecutionListResponse>, ApiError> {
    let id = WorkflowId::new(&workflow_id)?;
    let executions = state
        .execution_store
        .list_executions(&id, query.limit.unwrap_or(DEFAULT_EXECUTION_PAGE))
        .await?;

    Ok(Json(ExecutionListResponse {
        workflow_id,
        executions,
    }))
}
