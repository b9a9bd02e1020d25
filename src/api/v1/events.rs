//! Event ingestion endpoint

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::UserEvent;

/// POST /v1/events
///
/// Starts one execution per matching workflow and returns immediately.
pub async fn ingest_event(
    State(state): State<AppState>,
    Json(event): Json<UserEvent>,
) -> Result<impl IntoResponse, ApiError> {
    debug!(event_id = %event.id, name = %event.name, "Event received");

    let receipt = state.event_service.ingest(&event).await?;

    Ok((StatusCode::ACCEPTED, Json(receipt)))
}
