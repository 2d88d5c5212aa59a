//! Job command handlers
//!
//! Handles the worker actions on a single job: viewing it, checking in and
//! out, capturing photos, ticking checklist items and fetching the report.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use proofwork_core::domain::geo::GeoPoint;
use proofwork_core::domain::job::JobStatus;
use proofwork_core::domain::photo::PhotoKind;
use proofwork_core::rules::gates::Gate;
use proofwork_field::service::ReconcileOutcome;
use proofwork_field::{FieldContext, JobSession, PhotoOutcome, SessionView, ToggleOutcome};
use std::path::PathBuf;

use super::{colorize_connectivity, resolve_job_id};
use crate::types::IdOrPrefix;

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// Show progress, checklist and available actions
    Show {
        /// Job ID or unambiguous prefix
        id: String,

        /// Print the full view as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check in at the given position
    CheckIn {
        /// Job ID or unambiguous prefix
        id: String,

        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },
    /// Check out at the given position
    CheckOut {
        /// Job ID or unambiguous prefix
        id: String,

        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },
    /// Record a before or after photo
    Photo {
        /// Job ID or unambiguous prefix
        id: String,

        /// Photo type (before | after)
        kind: PhotoKind,

        /// Path of the captured image
        path: PathBuf,
    },
    /// Mark a checklist item as done
    Checklist {
        /// Job ID or unambiguous prefix
        id: String,

        /// Checklist item ID or unambiguous prefix
        item: String,

        /// Mark the item as not done instead
        #[arg(long)]
        undo: bool,
    },
    /// Download the report PDF of a completed job
    Report {
        /// Job ID or unambiguous prefix
        id: String,

        /// Output file (defaults to <job-id>-report.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Handle job commands
///
/// # Arguments
/// * `command` - The job command to execute
/// * `ctx` - The field context, with connectivity already probed
pub async fn handle_job_command(command: JobCommands, ctx: &FieldContext) -> Result<()> {
    match command {
        JobCommands::Show { id, json } => {
            let session = open(ctx, &id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&session.view())?);
            } else {
                print_job_view(&session.view());
            }
            Ok(())
        }
        JobCommands::CheckIn { id, lat, lng } => {
            let session = open(ctx, &id).await?;
            session.check_in(point(lat, lng)?).await?;
            println!("{}", "✓ Checked in".green());
            print_job_view(&session.view());
            Ok(())
        }
        JobCommands::CheckOut { id, lat, lng } => {
            let session = open(ctx, &id).await?;
            flush_pending(&session).await?;
            session.check_out(point(lat, lng)?).await?;
            println!("{}", "✓ Checked out".green());
            print_job_view(&session.view());
            Ok(())
        }
        JobCommands::Photo { id, kind, path } => {
            let session = open(ctx, &id).await?;
            match session.capture_photo(kind, path).await? {
                PhotoOutcome::Uploaded => println!("{}", format!("✓ {} photo uploaded", kind).green()),
                PhotoOutcome::Queued => {
                    println!("{}", format!("● {} photo queued for upload", kind).yellow())
                }
            }
            print_job_view(&session.view());
            Ok(())
        }
        JobCommands::Checklist { id, item, undo } => {
            let session = open(ctx, &id).await?;
            let item_ids = session.view().job.checklist.iter().map(|i| i.id).collect::<Vec<_>>();
            let item_id = IdOrPrefix::parse(&item).resolve("checklist item", item_ids)?;

            match session.toggle_checklist(item_id, !undo).await? {
                ToggleOutcome::Saved => println!("{}", "✓ Checklist saved".green()),
                ToggleOutcome::Queued => println!("{}", "● Checklist change queued".yellow()),
            }
            print_job_view(&session.view());
            Ok(())
        }
        JobCommands::Report { id, output } => {
            let session = open(ctx, &id).await?;
            let pdf = session.share_report().await?;
            let output = output.unwrap_or_else(|| PathBuf::from(format!("{}-report.pdf", session.job_id())));

            tokio::fs::write(&output, &pdf)
                .await
                .with_context(|| format!("Failed to write report to {}", output.display()))?;
            println!(
                "{}",
                format!("✓ Report saved to {} ({} bytes)", output.display(), pdf.len()).green()
            );
            Ok(())
        }
    }
}

async fn open(ctx: &FieldContext, id: &str) -> Result<JobSession> {
    let job_id = resolve_job_id(ctx, id)?;

    ctx.open_job(job_id)
        .await
        .with_context(|| format!("Failed to open job {}", job_id))
}

/// Delivers the job's queued changes so the backend sees them before check-out
async fn flush_pending(session: &JobSession) -> Result<()> {
    let view = session.view();
    if view.pending == 0 || !view.connectivity.is_online() {
        return Ok(());
    }

    println!("{}", format!("● Syncing {} queued change(s)", view.pending).yellow());
    match session.sync().await? {
        ReconcileOutcome::Halted { error, remaining, .. } => {
            anyhow::bail!("Sync halted with {} change(s) still queued: {}", remaining, error)
        }
        _ => Ok(()),
    }
}

fn point(lat: f64, lng: f64) -> Result<GeoPoint> {
    GeoPoint::new(lat, lng).map_err(anyhow::Error::msg)
}

/// Print the full job view
pub(super) fn print_job_view(view: &SessionView) {
    let job = &view.job;

    println!();
    println!("{} {}", "Job".bold(), job.id.to_string().cyan());
    println!("  Status:       {}", colorize_status(job.status));
    if let Some(name) = &job.location.name {
        println!("  Location:     {}", name);
    }
    if let Some(address) = &job.location.address {
        println!("  Address:      {}", address.dimmed());
    }
    println!(
        "  Window:       {}",
        job.window.starts_at.format("%Y-%m-%d %H:%M")
    );
    println!("  Connectivity: {}", colorize_connectivity(view.connectivity));
    if view.pending > 0 {
        println!("  Pending:      {} queued change(s)", view.pending.to_string().yellow());
    }
    if view.sync_incomplete {
        println!("  {}", "⚠ Sync incomplete, some changes were not delivered".red());
    }

    println!("\n{}", "Progress:".bold());
    let current = view.progress.current_step();
    for state in &view.progress.steps {
        let mark = if state.completed { "✓".green() } else { "○".dimmed() };
        let label = if Some(state.step) == current {
            state.step.label().bold()
        } else {
            state.step.label().normal()
        };
        println!("  {} {}", mark, label);
    }

    if !job.checklist.is_empty() {
        let done = job.checklist.iter().filter(|i| i.is_completed).count();
        println!(
            "\n{} ({}/{} done)",
            "Checklist:".bold(),
            done,
            job.checklist.len()
        );
        for item in &job.checklist {
            let mark = if item.is_completed { "[x]".green() } else { "[ ]".normal() };
            let required = if item.is_required { " *".red() } else { "".normal() };
            let short_id = item.id.to_string()[..8].to_string();
            println!("  {} {}{}  {}", mark, item.text, required, short_id.dimmed());
            if let Some(error) = view.item_errors.get(&item.id) {
                println!("      {}", format!("✗ {}", error).red());
            }
        }
    }

    println!("\n{}", "Photos:".bold());
    for kind in [PhotoKind::Before, PhotoKind::After] {
        let state = match job.photo(kind) {
            Some(photo) if photo.is_uploaded() => "uploaded".green(),
            Some(_) => "queued".yellow(),
            None => "missing".dimmed(),
        };
        println!("  {:<7} {}", kind.to_string(), state);
    }

    if !view.timeline.is_empty() {
        println!("\n{}", "Timeline:".bold());
        for entry in &view.timeline {
            let at = entry.event.timestamp.format("%Y-%m-%d %H:%M:%S");
            match &entry.event.coordinate {
                Some(point) => println!("  {}  {}  {}", at, entry.label, point.to_string().dimmed()),
                None => println!("  {}  {}", at, entry.label),
            }
        }
    }

    println!("\n{}", "Actions:".bold());
    let gates = &view.gates;
    print_gate("check in", &gates.check_in);
    print_gate("before photo", &gates.capture_before);
    print_gate("after photo", &gates.capture_after);
    print_gate("checklist", &gates.toggle_checklist);
    print_gate("check out", &gates.check_out);
    print_gate("report", &gates.share_report);
}

fn print_gate(action: &str, gate: &Gate) {
    match gate {
        Gate::Allowed => println!("  {} {}", "▸".green(), action),
        Gate::Blocked(blockers) => {
            let reasons: Vec<String> = blockers.iter().map(ToString::to_string).collect();
            println!(
                "  {} {}  {}",
                "▸".dimmed(),
                action.dimmed(),
                reasons.join("; ").dimmed()
            );
        }
    }
}

/// Colorize job status for display
fn colorize_status(status: JobStatus) -> ColoredString {
    match status {
        JobStatus::Scheduled => "Scheduled".yellow(),
        JobStatus::InProgress => "In progress".blue(),
        JobStatus::Completed => "Completed".green(),
        JobStatus::Cancelled => "Cancelled".red(),
    }
}
