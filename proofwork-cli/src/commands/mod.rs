//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod agent;
mod job;
mod outbox;
mod sync;

pub use job::JobCommands;
pub use outbox::OutboxCommands;

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use proofwork_core::domain::connectivity::Connectivity;
use proofwork_field::FieldContext;
use tracing::debug;
use uuid::Uuid;

use crate::config::GlobalArgs;
use crate::types::IdOrPrefix;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Work on a single job
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
    /// Inspect queued changes
    Outbox {
        #[command(subcommand)]
        command: OutboxCommands,
    },
    /// Send queued changes to the backend
    Sync {
        /// Job ID or unambiguous prefix to refresh afterwards
        job: Option<String>,
    },
    /// Stay running and sync whenever the backend becomes reachable
    Agent {
        /// Job ID or unambiguous prefix to keep open
        job: Option<String>,
    },
}

/// Handle a CLI command
///
/// Builds the field context, probes the backend once, then routes the
/// command to its handler module.
pub async fn handle_command(command: Commands, args: &GlobalArgs) -> Result<()> {
    let ctx = FieldContext::from_config(args.to_config())?;

    match command {
        Commands::Outbox { command } => outbox::handle_outbox_command(command, &ctx),
        Commands::Job { command } => {
            probe(&ctx).await;
            job::handle_job_command(command, &ctx).await
        }
        Commands::Sync { job } => {
            probe(&ctx).await;
            sync::handle_sync(job, &ctx).await
        }
        Commands::Agent { job } => agent::run_agent(job, &ctx).await,
    }
}

/// Probes the backend once so connectivity is known before acting
async fn probe(ctx: &FieldContext) -> Connectivity {
    let state = ctx.monitor.probe_once(&ctx.probe()).await;
    debug!("Connectivity: {}", state);
    state
}

/// Resolves a job ID or a prefix of a job cached on this device
fn resolve_job_id(ctx: &FieldContext, id: &str) -> Result<Uuid> {
    let cached = ctx
        .cache
        .job_ids()
        .context("Failed to list cached jobs for ID resolution")?;
    IdOrPrefix::parse(id).resolve("cached job", cached)
}

fn colorize_connectivity(connectivity: Connectivity) -> ColoredString {
    match connectivity {
        Connectivity::Online => "Online".green(),
        Connectivity::Offline => "Offline".red(),
        Connectivity::Unknown => "Unknown".yellow(),
    }
}
