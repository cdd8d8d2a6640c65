//! metasync connector runner
//!
//! Runs one reconciliation cycle: every line of the input is an event in its
//! JSON wire form, published in order. When the input ends, records seen in
//! the previous run but not in this one are tombstoned and the new baseline
//! is saved.
//!
//! Usage:
//!   metasync --config connector.json --events events.ndjson
//!   producer | metasync --config connector.json

use anyhow::{Context, Result};
use clap::Parser;
use metasync_cli::run_events;
use metasync_connector::{ConnectorConfig, CycleReport, ReconciliationEngine};
use std::path::PathBuf;
use tokio::io::{AsyncRead, BufReader};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "metasync")]
#[command(about = "Publish metadata changes and tombstone disappeared records")]
struct Args {
    /// Path to the connector configuration (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// NDJSON event stream, or `-` for stdin
    #[arg(short, long, default_value = "-")]
    events: String,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = ConnectorConfig::from_json_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    info!(connector_id = %config.connector_id, "metasync starting");

    let mut engine = ReconciliationEngine::from_config(&config)
        .await
        .context("opening connector cycle")?;

    let input = open_events(&args.events).await?;
    let observed = run_events(&mut engine, BufReader::new(input)).await?;
    info!(events = observed, "Input exhausted");

    let report = engine.finalize_cycle().await.context("finalizing cycle")?;
    print_report(&report);

    if !report.state_saved {
        warn!("Connector state was not saved");
    }
    Ok(())
}

async fn open_events(source: &str) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
    if source == "-" {
        return Ok(Box::new(tokio::io::stdin()));
    }
    let file = tokio::fs::File::open(source)
        .await
        .with_context(|| format!("opening {source}"))?;
    Ok(Box::new(file))
}

fn print_report(report: &CycleReport) {
    let summary = serde_json::json!({
        "observed": report.observed,
        "tombstones": report.tombstones,
        "delivered": report.delivered,
        "unconfirmed": report.unconfirmed,
        "failed": report.failed,
        "state_saved": report.state_saved,
        "export_written": report.export_written,
    });
    println!("{summary}");
}
