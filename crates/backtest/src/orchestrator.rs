//! Grid search orchestration over a bounded worker pool.
//!
//! Timelines are fetched once and shared read-only across workers; each
//! combination is evaluated in its own task gated by a semaphore. Results
//! accumulate per task and are merged when the pool drains, so no shared
//! mutable collection exists anywhere. Cancellation is cooperative: it
//! stops scheduling new combinations, lets in-flight ones finish, and
//! marks the report as partial.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use oddsgap_align::EventTimeline;
use oddsgap_core::{BacktestConfig, ConfigError, Split};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::costs::CostModel;
use crate::grid::{generate_grid, GridCombination};
use crate::metrics::CombinationMetrics;
use crate::provider::{ProviderError, TimelineProvider};
use crate::selection::{select_best, SelectionReport};
use crate::sim::simulate_event;
use crate::split::{assign_splits, SplitAssignment};

/// How often completed-combination progress is logged.
const PROGRESS_LOG_EVERY: usize = 25;

/// Cooperative cancellation handle for a running grid search.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
}

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. In-flight combinations finish; nothing new
    /// is scheduled.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// One combination's metrics across all three splits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinationRow {
    pub combination: GridCombination,
    pub train: CombinationMetrics,
    pub validation: CombinationMetrics,
    pub test: CombinationMetrics,
}

/// Everything a grid-search run produced.
///
/// A partially completed run (cancelled, or with skipped events) is
/// explicitly marked; it is never presented as a complete one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSearchReport {
    pub rows: Vec<CombinationRow>,
    pub selection: Option<SelectionReport>,
    /// The deterministic event-id partition, for audit and reproduction.
    pub splits: SplitAssignment,
    pub combinations_total: usize,
    pub combinations_evaluated: usize,
    pub events_requested: usize,
    pub events_loaded: usize,
    /// Events whose timeline could not be supplied and were skipped.
    pub skipped_events: usize,
    /// False when cancellation stopped the run early.
    pub complete: bool,
}

/// Runs the full grid search: splits, fan-out, fold, selection.
pub struct GridSearchOrchestrator {
    config: BacktestConfig,
    provider: Arc<dyn TimelineProvider>,
    cancel: CancelFlag,
    progress: Arc<AtomicUsize>,
}

impl GridSearchOrchestrator {
    #[must_use]
    pub fn new(config: BacktestConfig, provider: Arc<dyn TimelineProvider>) -> Self {
        Self {
            config,
            provider,
            cancel: CancelFlag::new(),
            progress: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handle for requesting cooperative cancellation.
    #[must_use]
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Combinations fully evaluated so far.
    #[must_use]
    pub fn combinations_completed(&self) -> usize {
        self.progress.load(Ordering::Relaxed)
    }

    /// Executes the grid search over the given event ids.
    ///
    /// # Errors
    /// Fails fast on invalid configuration, an empty grid, or an
    /// unreachable data source. Per-event data problems are logged,
    /// counted, and skipped instead.
    pub async fn run(&self, event_ids: &[String]) -> Result<GridSearchReport> {
        self.config.validate().context("invalid configuration")?;

        let grid = generate_grid(&self.config.grid);
        if grid.is_empty() {
            return Err(ConfigError::EmptyGrid.into());
        }

        let splits = Arc::new(assign_splits(event_ids, &self.config.split));
        let (timelines, skipped_events) = self.load_timelines(&splits).await?;
        let events_loaded = timelines.len();
        info!(
            events = events_loaded,
            skipped = skipped_events,
            combinations = grid.len(),
            workers = self.config.grid.worker_count,
            "starting grid search"
        );

        let timelines = Arc::new(timelines);
        let costs = Arc::new(CostModel::new(&self.config.execution));
        let semaphore = Arc::new(Semaphore::new(self.config.grid.worker_count));
        let total = grid.len();

        let mut join_set: JoinSet<CombinationRow> = JoinSet::new();
        let mut scheduled = 0usize;
        for combination in grid {
            if self.cancel.is_cancelled() {
                warn!(
                    scheduled,
                    total, "cancellation requested; no further combinations scheduled"
                );
                break;
            }
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .context("worker pool closed unexpectedly")?;
            let splits = Arc::clone(&splits);
            let timelines = Arc::clone(&timelines);
            let costs = Arc::clone(&costs);
            let progress = Arc::clone(&self.progress);
            let min_hold_seconds = self.config.execution.min_hold_seconds;
            let min_trade_count = self.config.grid.min_trade_count;

            join_set.spawn(async move {
                let _permit = permit;
                let row = evaluate_combination(
                    combination,
                    &splits,
                    &timelines,
                    &costs,
                    min_hold_seconds,
                    min_trade_count,
                );
                let done = progress.fetch_add(1, Ordering::Relaxed) + 1;
                if done % PROGRESS_LOG_EVERY == 0 {
                    info!(done, total, "grid search progress");
                }
                row
            });
            scheduled += 1;
        }

        // Each task returns its own row; this merge is the only point where
        // results come together.
        let mut rows: Vec<CombinationRow> = Vec::with_capacity(scheduled);
        while let Some(joined) = join_set.join_next().await {
            rows.push(joined.context("combination worker panicked")?);
        }
        rows.sort_by(|a, b| {
            a.combination
                .entry_threshold
                .total_cmp(&b.combination.entry_threshold)
                .then(
                    a.combination
                        .exit_threshold
                        .total_cmp(&b.combination.exit_threshold),
                )
        });

        let complete = scheduled == total;
        if !complete {
            warn!(
                evaluated = rows.len(),
                total, "grid search cancelled; reporting partial results"
            );
        }

        let selection = select_best(&rows, self.config.grid.top_n);
        if selection.is_none() {
            warn!("no combination cleared the minimum trade count; nothing selected");
        }

        let splits = Arc::try_unwrap(splits).unwrap_or_else(|arc| (*arc).clone());
        Ok(GridSearchReport {
            combinations_total: total,
            combinations_evaluated: rows.len(),
            rows,
            selection,
            splits,
            events_requested: event_ids.len(),
            events_loaded,
            skipped_events,
            complete,
        })
    }

    /// Fetches every assigned event's timeline, bounded by the worker
    /// count.
    ///
    /// Missing events are skipped and counted; an unreachable data source
    /// aborts the run.
    async fn load_timelines(
        &self,
        splits: &SplitAssignment,
    ) -> Result<(HashMap<String, Arc<EventTimeline>>, usize)> {
        let semaphore = Arc::new(Semaphore::new(self.config.grid.worker_count));
        let mut join_set = JoinSet::new();
        for event_id in splits.all_ids() {
            let event_id = event_id.clone();
            let provider = Arc::clone(&self.provider);
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .context("fetch pool closed unexpectedly")?;
            join_set.spawn(async move {
                let _permit = permit;
                let result = provider.timeline(&event_id).await;
                (event_id, result)
            });
        }

        let mut timelines = HashMap::new();
        let mut skipped = 0usize;
        let mut fatal: Option<anyhow::Error> = None;
        while let Some(joined) = join_set.join_next().await {
            let (event_id, result) = joined.context("timeline fetch task panicked")?;
            match result {
                Ok(timeline) => {
                    timelines.insert(event_id, Arc::new(timeline));
                }
                Err(ProviderError::MissingEvent(_)) => {
                    skipped += 1;
                    warn!(event_id = %event_id, "skipping event with no timeline");
                }
                Err(ProviderError::Unavailable(source)) => {
                    // Drain remaining tasks but surface the failure.
                    if fatal.is_none() {
                        fatal = Some(source.context("data source unreachable"));
                    }
                }
            }
        }
        if let Some(err) = fatal {
            return Err(err);
        }
        Ok((timelines, skipped))
    }
}

/// Evaluates one combination across all three splits.
fn evaluate_combination(
    combination: GridCombination,
    splits: &SplitAssignment,
    timelines: &HashMap<String, Arc<EventTimeline>>,
    costs: &CostModel,
    min_hold_seconds: i64,
    min_trade_count: u32,
) -> CombinationRow {
    let mut metrics = Split::ALL.iter().map(|&split| {
        split_metrics(
            combination,
            split,
            splits,
            timelines,
            costs,
            min_hold_seconds,
            min_trade_count,
        )
    });
    // Split::ALL is [Train, Validation, Test]; the iterator yields in that
    // order and always has three items.
    let train = metrics.next().unwrap_or_else(CombinationMetrics::empty);
    let validation = metrics.next().unwrap_or_else(CombinationMetrics::empty);
    let test = metrics.next().unwrap_or_else(CombinationMetrics::empty);
    CombinationRow {
        combination,
        train,
        validation,
        test,
    }
}

/// Folds every event of one split, sequentially and in sorted-id order, so
/// the cumulative-equity metrics are reproducible.
fn split_metrics(
    combination: GridCombination,
    split: Split,
    splits: &SplitAssignment,
    timelines: &HashMap<String, Arc<EventTimeline>>,
    costs: &CostModel,
    min_hold_seconds: i64,
    min_trade_count: u32,
) -> CombinationMetrics {
    let mut trades = Vec::new();
    for event_id in splits.ids(split) {
        let Some(timeline) = timelines.get(event_id) else {
            // Timeline was skipped at load; the event contributes nothing.
            continue;
        };
        let result = simulate_event(timeline, combination, costs, min_hold_seconds);
        trades.extend(result.trades);
    }
    CombinationMetrics::from_trades(&trades, min_trade_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InMemoryProvider;
    use async_trait::async_trait;
    use oddsgap_align::AlignedPoint;
    use oddsgap_core::EventOutcome;

    // ============================================================
    // Test Helpers
    // ============================================================

    fn point(timestamp: i64, forecast: f64, mid: f64) -> AlignedPoint {
        AlignedPoint {
            timestamp,
            forecast_prob: forecast,
            market_mid: mid,
            market_bid: Some(mid - 0.01),
            market_ask: Some(mid + 0.01),
        }
    }

    /// A timeline that trades once profitably under entry<=0.05/exit>=0.005.
    fn profitable_timeline(event_id: &str) -> EventTimeline {
        EventTimeline {
            event_id: event_id.to_string(),
            points: vec![
                point(0, 0.50, 0.50),
                point(60, 0.62, 0.50),  // long at ask 0.51
                point(120, 0.561, 0.56), // diverg. 0.001: exit at bid 0.55
            ],
            event_start: None,
            duration_seconds: None,
            realized_outcome: EventOutcome::Unknown,
        }
    }

    fn event_ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("evt-{i:03}")).collect()
    }

    fn small_config() -> BacktestConfig {
        let mut config = BacktestConfig::default()
            .with_entry_range(0.03, 0.05, 0.01)
            .with_exit_range(0.0, 0.02, 0.01)
            .with_min_hold_seconds(0)
            .with_worker_count(2);
        config.grid.min_trade_count = 1;
        config.execution.enable_fees = false;
        config
    }

    fn provider_for(ids: &[String]) -> Arc<InMemoryProvider> {
        Arc::new(InMemoryProvider::new(
            ids.iter().map(|id| profitable_timeline(id)),
        ))
    }

    struct UnreachableProvider;

    #[async_trait]
    impl TimelineProvider for UnreachableProvider {
        async fn timeline(&self, _event_id: &str) -> Result<EventTimeline, ProviderError> {
            Err(ProviderError::Unavailable(anyhow::anyhow!(
                "connection refused"
            )))
        }
    }

    // ============================================================
    // End-to-end runs
    // ============================================================

    #[tokio::test]
    async fn run_evaluates_every_combination() {
        let ids = event_ids(10);
        let orchestrator = GridSearchOrchestrator::new(small_config(), provider_for(&ids));

        let report = orchestrator.run(&ids).await.unwrap();

        assert!(report.complete);
        assert_eq!(report.combinations_evaluated, report.combinations_total);
        assert_eq!(report.rows.len(), report.combinations_total);
        assert_eq!(report.events_loaded, 10);
        assert_eq!(report.skipped_events, 0);
        // Every event trades under these thresholds, so train metrics are
        // populated and something gets selected.
        assert!(report.selection.is_some());
    }

    #[tokio::test]
    async fn repeated_runs_are_deterministic() {
        let ids = event_ids(12);

        let a = GridSearchOrchestrator::new(small_config(), provider_for(&ids))
            .run(&ids)
            .await
            .unwrap();
        let b = GridSearchOrchestrator::new(small_config(), provider_for(&ids))
            .run(&ids)
            .await
            .unwrap();

        assert_eq!(a.rows, b.rows);
        assert_eq!(
            a.selection.as_ref().map(|s| s.combination),
            b.selection.as_ref().map(|s| s.combination)
        );
        assert_eq!(a.splits.ids(Split::Train), b.splits.ids(Split::Train));
    }

    #[tokio::test]
    async fn invalid_config_fails_before_any_work() {
        let ids = event_ids(4);
        let config = small_config().with_ratios(0.5, 0.1, 0.1);
        let orchestrator = GridSearchOrchestrator::new(config, provider_for(&ids));

        let err = orchestrator.run(&ids).await.unwrap_err();
        assert!(err.to_string().contains("invalid configuration"));
    }

    // ============================================================
    // Failure isolation
    // ============================================================

    #[tokio::test]
    async fn missing_events_are_skipped_and_counted() {
        let ids = event_ids(6);
        // Provider only knows the first four events.
        let provider = Arc::new(InMemoryProvider::new(
            ids[..4].iter().map(|id| profitable_timeline(id)),
        ));
        let orchestrator = GridSearchOrchestrator::new(small_config(), provider);

        let report = orchestrator.run(&ids).await.unwrap();

        assert_eq!(report.skipped_events, 2);
        assert_eq!(report.events_loaded, 4);
        // The run still reports results for everything that succeeded.
        assert!(report.complete);
        assert_eq!(report.rows.len(), report.combinations_total);
    }

    #[tokio::test]
    async fn unreachable_data_source_is_fatal() {
        let ids = event_ids(3);
        let orchestrator =
            GridSearchOrchestrator::new(small_config(), Arc::new(UnreachableProvider));

        let err = orchestrator.run(&ids).await.unwrap_err();
        assert!(err.to_string().contains("data source unreachable"));
    }

    // ============================================================
    // Cancellation
    // ============================================================

    #[tokio::test]
    async fn cancelled_run_is_marked_partial() {
        let ids = event_ids(8);
        let orchestrator = GridSearchOrchestrator::new(small_config(), provider_for(&ids));

        // Cancel before scheduling starts: nothing runs, and the report
        // says so instead of masquerading as complete.
        orchestrator.cancel_flag().cancel();
        let report = orchestrator.run(&ids).await.unwrap();

        assert!(!report.complete);
        assert_eq!(report.combinations_evaluated, 0);
        assert!(report.rows.is_empty());
    }

    // ============================================================
    // Report contents
    // ============================================================

    #[tokio::test]
    async fn report_carries_split_lists_for_audit() {
        let ids = event_ids(10);
        let orchestrator = GridSearchOrchestrator::new(small_config(), provider_for(&ids));

        let report = orchestrator.run(&ids).await.unwrap();

        let assigned: usize = Split::ALL
            .iter()
            .map(|&s| report.splits.ids(s).len())
            .sum();
        assert_eq!(assigned, 10);
    }

    #[tokio::test]
    async fn rows_are_sorted_by_thresholds() {
        let ids = event_ids(6);
        let orchestrator = GridSearchOrchestrator::new(small_config(), provider_for(&ids));

        let report = orchestrator.run(&ids).await.unwrap();
        for pair in report.rows.windows(2) {
            let a = &pair[0].combination;
            let b = &pair[1].combination;
            assert!(
                a.entry_threshold < b.entry_threshold
                    || (a.entry_threshold == b.entry_threshold
                        && a.exit_threshold < b.exit_threshold)
            );
        }
    }
}
