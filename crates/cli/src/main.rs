//! `oddsgap` - grid-search backtester for forecast/market divergence.

mod output;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use oddsgap_align::SnapshotAligner;
use oddsgap_backtest::GridSearchOrchestrator;
use oddsgap_core::ConfigLoader;
use oddsgap_data::{SnapshotStore, StoreTimelineProvider};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "oddsgap", version, about = "Backtests a divergence strategy between a win-probability feed and prediction-market quotes, grid-searching entry/exit thresholds")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config/oddsgap.toml")]
    config: PathBuf,

    /// PostgreSQL connection string for the snapshot store.
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Connection pool size for the snapshot store.
    #[arg(long, default_value_t = 8)]
    db_connections: u32,

    /// JSON file with an array of event ids; defaults to every stored event.
    #[arg(long)]
    events_file: Option<PathBuf>,

    /// Directory the result files are written into.
    #[arg(long, default_value = "results")]
    out_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = ConfigLoader::load(&cli.config)?;
    config.validate().context("invalid configuration")?;

    let store = SnapshotStore::connect(&cli.database_url, cli.db_connections).await?;
    let event_ids = match &cli.events_file {
        Some(path) => read_event_ids(path)?,
        None => store.list_event_ids().await?,
    };
    anyhow::ensure!(!event_ids.is_empty(), "no events to backtest");
    info!(events = event_ids.len(), "loaded event universe");

    let aligner = SnapshotAligner::new(config.alignment.clone());
    let provider = Arc::new(StoreTimelineProvider::new(store, aligner));
    let orchestrator = GridSearchOrchestrator::new(config, provider);

    // Ctrl-C stops scheduling new combinations and lets in-flight ones
    // finish; the report is marked partial.
    let cancel = orchestrator.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; finishing in-flight combinations");
            cancel.cancel();
        }
    });

    let report = orchestrator.run(&event_ids).await?;

    std::fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("failed to create {}", cli.out_dir.display()))?;
    output::write_metrics_csv(&cli.out_dir.join("metrics.csv"), &report)?;
    output::write_selection_json(&cli.out_dir.join("selection.json"), &report)?;
    output::write_splits_json(&cli.out_dir.join("splits.json"), &report)?;
    output::write_run_summary_json(&cli.out_dir.join("run.json"), &report)?;

    info!(
        combinations = report.combinations_evaluated,
        events = report.events_loaded,
        skipped = report.skipped_events,
        out_dir = %cli.out_dir.display(),
        "grid search finished"
    );
    if !report.complete {
        warn!("run was cancelled; results cover only the evaluated combinations");
    }
    match &report.selection {
        Some(selection) => info!(
            entry = selection.combination.entry_threshold,
            exit = selection.combination.exit_threshold,
            train_net = %selection.train.net_profit,
            validation_net = %selection.validation.net_profit,
            test_net = %selection.test.net_profit,
            "selected thresholds"
        ),
        None => warn!("no combination was selectable; see metrics.csv"),
    }

    Ok(())
}

fn read_event_ids(path: &PathBuf) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let ids: Vec<String> = serde_json::from_str(&content)
        .with_context(|| format!("{} must be a JSON array of event ids", path.display()))?;
    Ok(ids)
}
