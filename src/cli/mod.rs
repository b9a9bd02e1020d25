//! CLI for the workflow engine
//!
//! - `serve`: HTTP API over the engine
//! - `run`: execute one workflow file against one event file, in memory
//! - `validate`: check a workflow file and print graph warnings

pub mod run;
pub mod serve;
pub mod validate;

use std::path::Path;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;

/// PMP Workflow Engine - event-triggered marketing automation
#[derive(Parser)]
#[command(name = "pmp-workflow-engine")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// Execute a workflow definition against an event
    Run(run::RunArgs),

    /// Validate a workflow definition
    Validate(validate::ValidateArgs),
}

/// Read and parse a JSON file
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}
