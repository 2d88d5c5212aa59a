//! Sync command handler
//!
//! Replays the outbox against the backend once and reports the outcome.

use anyhow::{Result, bail};
use colored::*;
use proofwork_field::FieldContext;
use proofwork_field::service::ReconcileOutcome;

use super::resolve_job_id;

/// Drains the outbox, then refreshes the touched jobs and `job`
pub async fn handle_sync(job: Option<String>, ctx: &FieldContext) -> Result<()> {
    let focus = job.map(|id| resolve_job_id(ctx, &id)).transpose()?;

    if !ctx.monitor.current().is_online() {
        println!(
            "{}",
            format!(
                "Backend unreachable, {} change(s) stay queued.",
                ctx.outbox.len()
            )
            .yellow()
        );
        return Ok(());
    }

    match ctx.reconciler.reconcile(focus).await? {
        ReconcileOutcome::Completed { applied, refreshed } => {
            println!(
                "{}",
                format!("✓ Delivered {} change(s)", applied).green()
            );
            for job in refreshed {
                println!("  {} Job {} is {}", "▸".cyan(), job.id, job.status);
            }
            Ok(())
        }
        ReconcileOutcome::Halted {
            entry_id,
            kind,
            error,
            remaining,
        } => {
            println!(
                "{}",
                format!("✗ Delivery of {} {} failed: {}", kind, entry_id, error).red()
            );
            bail!("Sync halted with {} change(s) still queued", remaining)
        }
        ReconcileOutcome::AlreadyRunning => {
            println!("{}", "Another sync is already running.".yellow());
            Ok(())
        }
    }
}
