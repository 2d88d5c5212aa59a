//! Proofwork CLI
//!
//! Field worker client for the Proofwork backend. Every command works
//! against the local outbox and job cache, so jobs that were opened once can
//! still be worked on without a network connection.

mod commands;
mod config;
mod types;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::GlobalArgs;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "proofwork")]
#[command(about = "Proofwork field job client", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "proofwork_field=info,proofwork_client=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    handle_command(cli.command, &cli.global).await
}
