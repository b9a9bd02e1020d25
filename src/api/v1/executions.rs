//! Execution query, cancellation and live event endpoints

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::execution::{ExecutionId, WorkflowExecution, WorkflowStep};
use crate::domain::workflow::WorkflowError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionDetail {
    #[serde(flatten)]
    pub execution: WorkflowExecution,
    pub steps: Vec<WorkflowStep>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub execution_id: ExecutionId,
    pub accepted: bool,
}

fn parse_id(raw: &str) -> Result<ExecutionId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid execution id '{}'", raw)))
}

/// GET /v1/executions/{execution_id}
pub async fn get_execution(
    State(state): State<AppState>,
    Path(execution_id): Path<String>,
) -> Result<Json<ExecutionDetail>, ApiError> {
    let id = parse_id(&execution_id)?;
    let execution = state
        .execution_store
        .get_execution(&id)
        .await?
        .ok_or_else(|| WorkflowError::execution_not_found(&execution_id))?;
    let steps = state.execution_store.list_steps(&id).await?;

    Ok(Json(ExecutionDetail { execution, steps }))
}

/// POST /v1/executions/{execution_id}/cancel
pub async fn cancel_execution(
    State(state): State<AppState>,
    Path(execution_id): Path<String>,
) -> Result<Json<CancelResponse>, ApiError> {
    let id = parse_id(&execution_id)?;
    let accepted = state
        .event_service
        .orchestrator()
        .request_cancellation(&id)
        .await?;

    Ok(Json(CancelResponse {
        execution_id: id,
        accepted,
    }))
}

/// GET /v1/executions/stream
///
/// Server-sent events for every execution; lagging clients lose events.
pub async fn stream_events(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let receiver = state
        .event_hub
        .subscribe()
        .ok_or_else(|| ApiError::unavailable("Execution event hub is not running"))?;

    debug!("Execution event subscriber connected");
    Ok(Sse::new(event_stream(receiver)).keep_alive(KeepAlive::default()))
}

fn event_stream(
    receiver: tokio::sync::broadcast::Receiver<crate::infrastructure::workflow::ExecutionEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(receiver).filter_map(|item| async move {
        let event = item.ok()?;
        Event::default().json_data(&event).ok().map(Ok)
    })
}
