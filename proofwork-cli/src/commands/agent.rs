//! Agent command handler
//!
//! Keeps probing the backend and drains the outbox each time the device
//! comes back online, until interrupted.

use anyhow::Result;
use async_trait::async_trait;
use colored::*;
use proofwork_field::scheduler::OnlineHandler;
use proofwork_field::{FieldContext, JobSession};
use std::sync::Arc;
use tracing::info;

use super::job::print_job_view;
use super::{colorize_connectivity, probe, resolve_job_id};

/// Syncs the open job on reconnect and reprints it
struct WatchedJob {
    session: Arc<JobSession>,
}

#[async_trait]
impl OnlineHandler for WatchedJob {
    async fn on_online(&self) {
        self.session.on_online().await;
        print_job_view(&self.session.view());
    }
}

/// Runs until Ctrl-C
///
/// With a job, the job stays open and its view is reprinted after every
/// reconnect sync; without one, only the outbox is drained.
pub async fn run_agent(job: Option<String>, ctx: &FieldContext) -> Result<()> {
    let session = match job {
        Some(id) => {
            let job_id = resolve_job_id(ctx, &id)?;
            probe(ctx).await;
            Some(Arc::new(ctx.open_job(job_id).await?))
        }
        None => None,
    };

    let handler: Arc<dyn OnlineHandler> = match &session {
        Some(session) => Arc::new(WatchedJob {
            session: Arc::clone(session),
        }),
        None => ctx.reconciler.clone(),
    };

    // Already online: the reconnect loop will not see a transition
    if ctx.monitor.current().is_online() {
        handler.on_online().await;
    }

    let handles = ctx.start_background(handler);
    let mut connectivity = ctx.monitor.subscribe();

    info!("Agent started");
    println!(
        "{}",
        format!(
            "Agent running ({} queued change(s)). Press Ctrl-C to stop.",
            ctx.outbox.len()
        )
        .bold()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = connectivity.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *connectivity.borrow_and_update();
                println!(
                    "{} {}  ({} queued)",
                    "●".cyan(),
                    colorize_connectivity(state),
                    ctx.outbox.len()
                );
            }
        }
    }

    for handle in handles {
        handle.abort();
    }
    if let Some(session) = &session {
        session.abandon();
    }

    info!("Agent stopped");
    Ok(())
}
