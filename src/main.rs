//! Main entry point for the acs-collector CLI

use acs_collector::cli::{Cli, Commands};
use acs_collector::collector::{CancelToken, RunOutcome};
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("acs_collector=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    // Ctrl+C requests cooperative cancellation: no new tasks are submitted,
    // in-flight tasks finish, and the run finalizes with what it has.
    let cancel = CancelToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Ctrl+C received - finishing in-flight tasks...");
                cancel.cancel();
            }
        }
    });

    let result = match cli.command {
        Commands::Collect(ref args) => args
            .execute(&cli, cancel.clone())
            .await
            .map_err(|e| anyhow::anyhow!(e)),
        Commands::Regions(ref regions_cmd) => regions_cmd
            .execute()
            .map(|_| RunOutcome::Clean)
            .map_err(|e| anyhow::anyhow!(e)),
    };

    match result {
        Ok(RunOutcome::Cancelled) => std::process::exit(130),
        Ok(_) => {}
        Err(e) => {
            error!("Command failed: {}", e);
            std::process::exit(1);
        }
    }
}
