//! uptimed — the uptime sync daemon.
//!
//! Assembles the reconciliation stack in one process:
//! - Site store (in memory, seeded from a JSON snapshot)
//! - Event bus
//! - Status update manager with full-resync fallback
//!
//! # Usage
//!
//! ```text
//! uptimed replay --config uptime.toml --sites sites.json --events events.jsonl
//! uptimed check --events events.jsonl
//! ```

mod feed;
mod replay;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use uptime_core::UptimeConfig;
use uptime_core::config::LoggingConfig;

#[derive(Parser)]
#[command(name = "uptimed", about = "Uptime sync daemon")]
struct Cli {
    /// Path to uptime.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a recorded event feed against a site snapshot.
    Replay {
        /// Site snapshot (JSON array). Defaults to `[snapshot] path`.
        #[arg(long)]
        sites: Option<PathBuf>,

        /// Event feed (JSON lines).
        #[arg(long)]
        events: PathBuf,
    },
    /// Validate the status-changed entries of an event feed.
    Check {
        #[arg(long)]
        events: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => UptimeConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => UptimeConfig::default(),
    };

    init_tracing(&config.logging);

    match cli.command {
        Command::Replay { sites, events } => {
            let sites = sites
                .or_else(|| config.snapshot.as_ref().map(|s| s.path.clone()))
                .context("no site snapshot given (use --sites or [snapshot] path)")?;

            let report = replay::replay(&config, &sites, &events).await?;
            info!(
                delivered = report.delivered,
                undelivered = report.undelivered,
                notified = report.stats.notified,
                failed_resyncs = report.stats.failed_resyncs,
                "replay finished"
            );
            println!("{}", serde_json::to_string_pretty(&report.sites)?);
            Ok(())
        }
        Command::Check { events } => {
            for line in replay::check(&events)? {
                println!("{line}");
            }
            Ok(())
        }
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&logging.filter))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
