//! Outbox command handlers
//!
//! Shows what is still waiting to be delivered to the backend.

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use proofwork_core::domain::outbox::{OutboxEntry, OutboxMutation};
use proofwork_field::FieldContext;

/// Outbox subcommands
#[derive(Subcommand)]
pub enum OutboxCommands {
    /// List queued changes in delivery order
    List,
}

/// Handle outbox commands
pub fn handle_outbox_command(command: OutboxCommands, ctx: &FieldContext) -> Result<()> {
    match command {
        OutboxCommands::List => list_entries(ctx),
    }
}

fn list_entries(ctx: &FieldContext) -> Result<()> {
    let entries = ctx.outbox.entries();

    if entries.is_empty() {
        println!("{}", "Outbox is empty.".green());
        return Ok(());
    }

    println!(
        "{}",
        format!("{} queued change(s), oldest first:", entries.len()).bold()
    );
    println!();
    for (position, entry) in entries.iter().enumerate() {
        print_entry(position + 1, entry);
    }

    if ctx.reconciler.sync_incomplete() {
        println!(
            "{}",
            "⚠ The last sync halted; run `proofwork sync` to retry.".red()
        );
    }

    Ok(())
}

fn print_entry(position: usize, entry: &OutboxEntry) {
    println!(
        "  {} #{} {}",
        "▸".cyan(),
        position,
        entry.kind().to_string().bold()
    );
    println!("    Entry:    {}", entry.id.to_string().dimmed());
    println!("    Job:      {}", entry.job_id);
    println!(
        "    Queued:   {}",
        entry.enqueued_at.format("%Y-%m-%d %H:%M:%S")
    );

    match &entry.mutation {
        OutboxMutation::ChecklistBulk { items } => {
            let done = items.iter().filter(|i| i.is_completed).count();
            println!("    Items:    {}/{} done", done, items.len());
        }
        OutboxMutation::PhotoUpload {
            photo_type,
            local_handle,
        } => {
            println!("    Photo:    {} ({})", photo_type, local_handle.display());
        }
    }

    if entry.attempts > 0 {
        println!(
            "    Attempts: {}",
            entry.attempts.to_string().yellow()
        );
    }
    if let Some(error) = &entry.last_error {
        println!("    Error:    {}", error.red());
    }
    println!();
}
