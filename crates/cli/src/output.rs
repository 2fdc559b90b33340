//! Result file writers: CSV metrics table, JSON selection and split lists.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use oddsgap_backtest::{CombinationMetrics, GridSearchReport};
use oddsgap_core::Split;
use serde::Serialize;

/// One line of the per-combination-per-split metrics table.
#[derive(Debug, Serialize)]
struct MetricsCsvRow<'a> {
    entry_threshold: f64,
    exit_threshold: f64,
    split: &'a str,
    trade_count: u32,
    wins: u32,
    losses: u32,
    net_profit: String,
    gross_profit: String,
    total_fees: String,
    total_slippage: String,
    win_rate: f64,
    profit_factor: Option<f64>,
    max_drawdown: String,
    avg_hold_seconds: f64,
    wilson_ci_lower: f64,
    wilson_ci_upper: f64,
    is_valid: bool,
}

impl<'a> MetricsCsvRow<'a> {
    fn new(entry: f64, exit: f64, split: Split, metrics: &CombinationMetrics) -> Self {
        Self {
            entry_threshold: entry,
            exit_threshold: exit,
            split: split.as_str(),
            trade_count: metrics.trade_count,
            wins: metrics.wins,
            losses: metrics.losses,
            net_profit: metrics.net_profit.to_string(),
            gross_profit: metrics.gross_profit.to_string(),
            total_fees: metrics.total_fees.to_string(),
            total_slippage: metrics.total_slippage.to_string(),
            win_rate: metrics.win_rate,
            profit_factor: metrics.profit_factor,
            max_drawdown: metrics.max_drawdown.to_string(),
            avg_hold_seconds: metrics.avg_hold_seconds,
            wilson_ci_lower: metrics.wilson_ci_lower,
            wilson_ci_upper: metrics.wilson_ci_upper,
            is_valid: metrics.is_valid,
        }
    }
}

/// Writes one row per `(combination, split)` to `path`.
pub fn write_metrics_csv(path: &Path, report: &GridSearchReport) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;

    for row in &report.rows {
        let entry = row.combination.entry_threshold;
        let exit = row.combination.exit_threshold;
        for (split, metrics) in [
            (Split::Train, &row.train),
            (Split::Validation, &row.validation),
            (Split::Test, &row.test),
        ] {
            writer.serialize(MetricsCsvRow::new(entry, exit, split, metrics))?;
        }
    }

    writer.flush().context("failed to flush metrics table")?;
    Ok(())
}

/// Writes the selection record (or an explicit null) as pretty JSON.
pub fn write_selection_json(path: &Path, report: &GridSearchReport) -> Result<()> {
    write_json(path, &report.selection)
}

/// Writes the train/validation/test id lists as pretty JSON.
pub fn write_splits_json(path: &Path, report: &GridSearchReport) -> Result<()> {
    write_json(path, &report.splits)
}

/// Writes run-level counters so a partial run is distinguishable on disk.
pub fn write_run_summary_json(path: &Path, report: &GridSearchReport) -> Result<()> {
    #[derive(Serialize)]
    struct RunSummary {
        complete: bool,
        combinations_total: usize,
        combinations_evaluated: usize,
        events_requested: usize,
        events_loaded: usize,
        skipped_events: usize,
    }
    write_json(
        path,
        &RunSummary {
            complete: report.complete,
            combinations_total: report.combinations_total,
            combinations_evaluated: report.combinations_evaluated,
            events_requested: report.events_requested,
            events_loaded: report.events_loaded,
            skipped_events: report.skipped_events,
        },
    )
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, value)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
