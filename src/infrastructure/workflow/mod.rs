//! Workflow infrastructure - orchestration, trigger matching and live events

mod events;
mod orchestrator;
mod trigger_matcher;

pub use events::{DEFAULT_EVENT_CAPACITY, ExecutionEvent, ExecutionEventHub};
pub use orchestrator::{ExecutionOrchestrator, OrchestratorConfig};
pub use trigger_matcher::TriggerMatcher;
