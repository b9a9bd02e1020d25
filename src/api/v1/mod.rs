//! Version 1 endpoints

pub mod events;
pub mod executions;
pub mod workflows;

use axum::{
    Router,
    routing::{get, post},
};

use super::state::AppState;

pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/events", post(events::ingest_event))
        .route(
            "/workflows",
            get(workflows::list_workflows).post(workflows::create_workflow),
        )
        .route(
            "/workflows/{workflow_id}",
            get(workflows::get_workflow)
                .put(workflows::update_workflow)
                .delete(workflows::delete_workflow),
        )
        .route(
            "/workflows/{workflow_id}/validate",
            post(workflows::validate_workflow),
        )
        .route(
            "/workflows/{workflow_id}/executions",
            get(workflows::list_workflow_executions),
        )
        .route("/executions/stream", get(executions::stream_events))
        .route("/executions/{execution_id}", get(executions::get_execution))
        .route(
            "/executions/{execution_id}/cancel",
            post(executions::cancel_execution),
        )
}
