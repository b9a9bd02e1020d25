//! Validate command - structural checks and graph warnings

use std::path::PathBuf;

use clap::Args;

use crate::domain::Workflow;
use crate::infrastructure::services::validate_definition;

use super::read_json;

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Workflow definition (JSON)
    pub workflow: PathBuf,
}

pub fn run(args: ValidateArgs) -> anyhow::Result<()> {
    let workflow: Workflow = read_json(&args.workflow)?;
    let report = validate_definition(&workflow)
        .map_err(|e| anyhow::anyhow!("{}: {}", args.workflow.display(), e))?;

    if report.is_clean() {
        println!("{}: ok", workflow.id());
    } else {
        println!("{}: ok with {} warning(s)", workflow.id(), report.warnings.len());
        for warning in &report.warnings {
            println!("  warning: {}", warning);
        }
    }

    Ok(())
}
