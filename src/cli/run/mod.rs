//! Run command - one workflow, one event, in-memory stores

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use tracing::warn;

use crate::config::AppConfig;
use crate::domain::execution::{WorkflowExecution, WorkflowStep};
use crate::domain::{PromoCodeBatch, UserEvent, Workflow};
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::services::validate_definition;
use crate::Engine;

use super::read_json;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Workflow definition (JSON)
    #[arg(long, short)]
    pub workflow: PathBuf,

    /// Triggering event (JSON)
    #[arg(long, short)]
    pub event: PathBuf,

    /// Promo-code batches to seed (JSON array)
    #[arg(long)]
    pub promo_batches: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReport {
    execution: WorkflowExecution,
    steps: Vec<WorkflowStep>,
}

pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = AppConfig::load().unwrap_or_default();
    // stdout carries the report
    config.logging.level = "warn".to_string();
    init_logging(&config.logging);

    let workflow: Workflow = read_json(&args.workflow)?;
    let event: UserEvent = read_json(&args.event)?;
    let batches: Vec<PromoCodeBatch> = match &args.promo_batches {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };

    for warning in validate_definition(&workflow)?.warnings {
        warn!(workflow_id = %workflow.id(), "{}", warning);
    }

    let engine = Engine::in_memory_with(&config, vec![workflow.clone()], batches);
    let execution = engine
        .orchestrator
        .execute(&workflow, event.snapshot())
        .await?;
    let steps = engine.execution_store.list_steps(&execution.id).await?;

    let report = RunReport { execution, steps };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
