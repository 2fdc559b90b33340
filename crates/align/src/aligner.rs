//! Row normalization, quote selection, and timeline construction.

use oddsgap_core::{AlignmentConfig, ForecastSource};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::row::{EventMeta, SnapshotRow};
use crate::timeline::{AlignedPoint, EventTimeline};

/// Tolerance for the complement-sum data-quality check.
const COMPLEMENT_EPSILON: f64 = 0.02;
/// Two home-space mids for the same tick should agree within this band.
const SIDE_AGREEMENT_EPSILON: f64 = 0.05;

/// Per-event drop diagnostics, keyed by reason.
///
/// Purely observational; alignment never fails on a single bad row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentStats {
    pub total_rows: usize,
    pub kept: usize,
    pub dropped_missing_forecast: usize,
    pub dropped_missing_quote: usize,
    pub dropped_out_of_range: usize,
    pub dropped_excluded_window: usize,
    pub dropped_duplicate_timestamp: usize,
    /// Rows where the two market sides summed to ~1.0 instead of agreeing,
    /// indicating the upstream away-side conversion did not happen.
    pub complement_warnings: usize,
}

impl AlignmentStats {
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.total_rows - self.kept
    }

    /// Folds another event's counters into this one.
    pub fn merge(&mut self, other: &Self) {
        self.total_rows += other.total_rows;
        self.kept += other.kept;
        self.dropped_missing_forecast += other.dropped_missing_forecast;
        self.dropped_missing_quote += other.dropped_missing_quote;
        self.dropped_out_of_range += other.dropped_out_of_range;
        self.dropped_excluded_window += other.dropped_excluded_window;
        self.dropped_duplicate_timestamp += other.dropped_duplicate_timestamp;
        self.complement_warnings += other.complement_warnings;
    }
}

/// A normalized quote for one market side.
struct SideQuote {
    mid: f64,
    bid: Option<f64>,
    ask: Option<f64>,
}

impl SideQuote {
    fn has_both_sides(&self) -> bool {
        self.bid.is_some() && self.ask.is_some()
    }

    fn has_any_side(&self) -> bool {
        self.bid.is_some() || self.ask.is_some()
    }
}

/// Builds one [`EventTimeline`] per event from raw snapshot rows.
#[derive(Debug, Clone)]
pub struct SnapshotAligner {
    config: AlignmentConfig,
}

impl SnapshotAligner {
    #[must_use]
    pub fn new(config: AlignmentConfig) -> Self {
        Self { config }
    }

    /// Aligns one event's rows into a timeline.
    ///
    /// Rows missing the forecast or a usable market quote are dropped and
    /// counted; an event whose rows all drop yields an empty timeline, which
    /// downstream simulates to zero trades.
    #[must_use]
    pub fn align(&self, meta: &EventMeta, rows: &[SnapshotRow]) -> (EventTimeline, AlignmentStats) {
        let mut stats = AlignmentStats {
            total_rows: rows.len(),
            ..AlignmentStats::default()
        };

        let mut points: Vec<AlignedPoint> = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(point) = self.align_row(meta, row, &mut stats) {
                points.push(point);
            }
        }

        // Strict ascending order is a hard precondition for the simulator.
        points.sort_by_key(|p| p.timestamp);
        let before = points.len();
        points.dedup_by_key(|p| p.timestamp);
        stats.dropped_duplicate_timestamp = before - points.len();
        stats.kept = points.len();

        if stats.complement_warnings > 0 {
            warn!(
                event_id = %meta.event_id,
                rows = stats.complement_warnings,
                "market sides sum to ~1.0; upstream away-quote conversion looks missing"
            );
        }
        debug!(
            event_id = %meta.event_id,
            kept = stats.kept,
            dropped = stats.dropped(),
            "aligned event rows"
        );

        let timeline = EventTimeline {
            event_id: meta.event_id.clone(),
            points,
            event_start: meta.event_start,
            duration_seconds: meta.duration_seconds,
            realized_outcome: meta.realized_outcome,
        };
        (timeline, stats)
    }

    fn align_row(
        &self,
        meta: &EventMeta,
        row: &SnapshotRow,
        stats: &mut AlignmentStats,
    ) -> Option<AlignedPoint> {
        if self.in_excluded_window(meta, row.timestamp) {
            stats.dropped_excluded_window += 1;
            return None;
        }

        let raw_forecast = match self.config.forecast_source {
            ForecastSource::Primary => row.forecast_prob,
            ForecastSource::Model => row.model_prob,
        };
        let forecast_prob = match raw_forecast {
            Some(value) => match normalize_prob(value) {
                Some(p) => p,
                None => {
                    stats.dropped_out_of_range += 1;
                    return None;
                }
            },
            None => {
                stats.dropped_missing_forecast += 1;
                return None;
            }
        };

        let quote = match self.select_quote(row, stats) {
            Ok(Some(quote)) => quote,
            Ok(None) => {
                stats.dropped_missing_quote += 1;
                return None;
            }
            Err(()) => {
                stats.dropped_out_of_range += 1;
                return None;
            }
        };

        Some(AlignedPoint {
            timestamp: row.timestamp,
            forecast_prob,
            market_mid: quote.mid,
            market_bid: quote.bid,
            market_ask: quote.ask,
        })
    }

    /// Picks between the home- and away-denominated quote for one row.
    ///
    /// Preference order: the side carrying both bid and ask, then the side
    /// carrying any bid/ask, then home. The away quote is already expressed
    /// in home-probability space upstream and is never inverted.
    ///
    /// `Err(())` marks a row whose selected mid failed range normalization.
    fn select_quote(
        &self,
        row: &SnapshotRow,
        stats: &mut AlignmentStats,
    ) -> Result<Option<SideQuote>, ()> {
        let home = normalize_side(row.home_mid, row.home_bid, row.home_ask);
        let away = normalize_side(row.away_mid, row.away_bid, row.away_ask);

        if row.home_mid.is_some() && home.is_err() || row.away_mid.is_some() && away.is_err() {
            return Err(());
        }
        let home = home.unwrap_or(None);
        let away = away.unwrap_or(None);

        if let (Some(h), Some(a)) = (&home, &away) {
            let agree = (h.mid - a.mid).abs() <= SIDE_AGREEMENT_EPSILON;
            let complementary = (h.mid + a.mid - 1.0).abs() <= COMPLEMENT_EPSILON;
            if !agree && complementary {
                stats.complement_warnings += 1;
            }
        }

        Ok(match (home, away) {
            (Some(h), Some(a)) => {
                if h.has_both_sides() {
                    Some(h)
                } else if a.has_both_sides() {
                    Some(a)
                } else if h.has_any_side() {
                    Some(h)
                } else if a.has_any_side() {
                    Some(a)
                } else {
                    Some(h)
                }
            }
            (Some(h), None) => Some(h),
            (None, Some(a)) => Some(a),
            (None, None) => None,
        })
    }

    fn in_excluded_window(&self, meta: &EventMeta, timestamp: i64) -> bool {
        if let Some(start) = meta.event_start {
            if timestamp < start + self.config.exclude_first_seconds {
                return true;
            }
            if let Some(duration) = meta.duration_seconds {
                let end = start + duration;
                if timestamp > end - self.config.exclude_last_seconds {
                    return true;
                }
            }
        }
        false
    }
}

/// Normalizes a probability-like value.
///
/// Values in `(1, 100]` are treated as percentages and divided by 100;
/// anything non-finite or outside `[0, 100]` is rejected.
fn normalize_prob(value: f64) -> Option<f64> {
    if !value.is_finite() || value < 0.0 || value > 100.0 {
        return None;
    }
    if value > 1.0 {
        Some(value / 100.0)
    } else {
        Some(value)
    }
}

/// Normalizes one quote side.
///
/// `Ok(None)` when the side has no mid; `Err(())` when the mid is out of
/// range. Bid/ask values that fail normalization are dropped individually
/// rather than poisoning the whole side.
fn normalize_side(
    mid: Option<f64>,
    bid: Option<f64>,
    ask: Option<f64>,
) -> Result<Option<SideQuote>, ()> {
    let Some(raw_mid) = mid else {
        return Ok(None);
    };
    let mid = normalize_prob(raw_mid).ok_or(())?;
    Ok(Some(SideQuote {
        mid,
        bid: bid.and_then(normalize_prob),
        ask: ask.and_then(normalize_prob),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use oddsgap_core::AlignmentConfig;

    // ============================================================
    // Test Helpers
    // ============================================================

    fn aligner() -> SnapshotAligner {
        SnapshotAligner::new(AlignmentConfig::default())
    }

    fn full_row(timestamp: i64) -> SnapshotRow {
        SnapshotRow::at(timestamp)
            .with_forecast(0.60)
            .with_home_quote(0.55, Some(0.54), Some(0.56))
    }

    // ============================================================
    // Normalization
    // ============================================================

    #[test]
    fn fraction_values_pass_through() {
        assert_eq!(normalize_prob(0.42), Some(0.42));
        assert_eq!(normalize_prob(0.0), Some(0.0));
        assert_eq!(normalize_prob(1.0), Some(1.0));
    }

    #[test]
    fn percentage_values_are_divided_by_100() {
        assert_eq!(normalize_prob(42.0), Some(0.42));
        assert_eq!(normalize_prob(100.0), Some(1.0));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert_eq!(normalize_prob(-0.1), None);
        assert_eq!(normalize_prob(100.5), None);
        assert_eq!(normalize_prob(f64::NAN), None);
        assert_eq!(normalize_prob(f64::INFINITY), None);
    }

    #[test]
    fn percentage_row_normalizes_end_to_end() {
        let meta = EventMeta::new("evt-1");
        let rows = [SnapshotRow::at(10)
            .with_forecast(62.0)
            .with_home_quote(55.0, Some(54.0), Some(56.0))];

        let (timeline, stats) = aligner().align(&meta, &rows);

        assert_eq!(stats.kept, 1);
        let p = &timeline.points[0];
        assert!((p.forecast_prob - 0.62).abs() < 1e-12);
        assert!((p.market_mid - 0.55).abs() < 1e-12);
        assert!((p.market_bid.unwrap() - 0.54).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_mid_drops_point_and_counts_it() {
        let meta = EventMeta::new("evt-1");
        let rows = [SnapshotRow::at(10)
            .with_forecast(0.6)
            .with_home_quote(150.0, None, None)];

        let (timeline, stats) = aligner().align(&meta, &rows);

        assert!(timeline.is_empty());
        assert_eq!(stats.dropped_out_of_range, 1);
    }

    // ============================================================
    // Quote selection
    // ============================================================

    #[test]
    fn side_with_both_bid_and_ask_wins() {
        let meta = EventMeta::new("evt-1");
        let rows = [SnapshotRow::at(10)
            .with_forecast(0.6)
            .with_home_quote(0.50, None, None)
            .with_away_quote(0.52, Some(0.51), Some(0.53))];

        let (timeline, _) = aligner().align(&meta, &rows);

        assert!((timeline.points[0].market_mid - 0.52).abs() < 1e-12);
        assert!(timeline.points[0].market_bid.is_some());
        assert!(timeline.points[0].market_ask.is_some());
    }

    #[test]
    fn side_with_any_bid_or_ask_beats_bare_mid() {
        let meta = EventMeta::new("evt-1");
        let rows = [SnapshotRow::at(10)
            .with_forecast(0.6)
            .with_home_quote(0.50, None, None)
            .with_away_quote(0.52, Some(0.51), None)];

        let (timeline, _) = aligner().align(&meta, &rows);
        assert!((timeline.points[0].market_mid - 0.52).abs() < 1e-12);
    }

    #[test]
    fn home_preferred_when_sides_are_equally_bare() {
        let meta = EventMeta::new("evt-1");
        let rows = [SnapshotRow::at(10)
            .with_forecast(0.6)
            .with_home_quote(0.50, None, None)
            .with_away_quote(0.52, None, None)];

        let (timeline, _) = aligner().align(&meta, &rows);
        assert!((timeline.points[0].market_mid - 0.50).abs() < 1e-12);
    }

    #[test]
    fn home_preferred_when_both_sides_are_complete() {
        let meta = EventMeta::new("evt-1");
        let rows = [SnapshotRow::at(10)
            .with_forecast(0.6)
            .with_home_quote(0.50, Some(0.49), Some(0.51))
            .with_away_quote(0.52, Some(0.51), Some(0.53))];

        let (timeline, _) = aligner().align(&meta, &rows);
        assert!((timeline.points[0].market_mid - 0.50).abs() < 1e-12);
    }

    #[test]
    fn away_quote_is_not_inverted() {
        let meta = EventMeta::new("evt-1");
        // Away mid 0.70 in home space stays 0.70; inversion would give 0.30.
        let rows = [SnapshotRow::at(10)
            .with_forecast(0.6)
            .with_away_quote(0.70, Some(0.69), Some(0.71))];

        let (timeline, _) = aligner().align(&meta, &rows);
        assert!((timeline.points[0].market_mid - 0.70).abs() < 1e-12);
    }

    #[test]
    fn complementary_sides_raise_data_quality_warning() {
        let meta = EventMeta::new("evt-1");
        // 0.70 + 0.30 = 1.0: away side looks unconverted.
        let rows = [SnapshotRow::at(10)
            .with_forecast(0.6)
            .with_home_quote(0.70, None, None)
            .with_away_quote(0.30, None, None)];

        let (_, stats) = aligner().align(&meta, &rows);
        assert_eq!(stats.complement_warnings, 1);
    }

    #[test]
    fn agreeing_sides_do_not_warn() {
        let meta = EventMeta::new("evt-1");
        let rows = [SnapshotRow::at(10)
            .with_forecast(0.6)
            .with_home_quote(0.52, None, None)
            .with_away_quote(0.50, None, None)];

        let (_, stats) = aligner().align(&meta, &rows);
        assert_eq!(stats.complement_warnings, 0);
    }

    // ============================================================
    // Missing-field drops
    // ============================================================

    #[test]
    fn row_without_forecast_is_dropped() {
        let meta = EventMeta::new("evt-1");
        let rows = [SnapshotRow::at(10).with_home_quote(0.5, None, None)];

        let (timeline, stats) = aligner().align(&meta, &rows);
        assert!(timeline.is_empty());
        assert_eq!(stats.dropped_missing_forecast, 1);
    }

    #[test]
    fn row_without_any_quote_is_dropped() {
        let meta = EventMeta::new("evt-1");
        let rows = [SnapshotRow::at(10).with_forecast(0.6)];

        let (timeline, stats) = aligner().align(&meta, &rows);
        assert!(timeline.is_empty());
        assert_eq!(stats.dropped_missing_quote, 1);
    }

    #[test]
    fn all_rows_dropped_yields_empty_timeline_not_error() {
        let meta = EventMeta::new("evt-1");
        let rows = [SnapshotRow::at(10), SnapshotRow::at(20)];

        let (timeline, stats) = aligner().align(&meta, &rows);
        assert!(timeline.is_empty());
        assert_eq!(stats.dropped(), 2);
    }

    // ============================================================
    // Forecast source selection
    // ============================================================

    #[test]
    fn model_source_uses_model_prob() {
        let config = AlignmentConfig {
            forecast_source: ForecastSource::Model,
            ..AlignmentConfig::default()
        };
        let aligner = SnapshotAligner::new(config);
        let meta = EventMeta::new("evt-1");
        let mut row = full_row(10);
        row.model_prob = Some(0.80);

        let (timeline, _) = aligner.align(&meta, &[row]);
        assert!((timeline.points[0].forecast_prob - 0.80).abs() < 1e-12);
    }

    #[test]
    fn model_source_drops_rows_without_model_prob() {
        let config = AlignmentConfig {
            forecast_source: ForecastSource::Model,
            ..AlignmentConfig::default()
        };
        let aligner = SnapshotAligner::new(config);
        let meta = EventMeta::new("evt-1");

        let (timeline, stats) = aligner.align(&meta, &[full_row(10)]);
        assert!(timeline.is_empty());
        assert_eq!(stats.dropped_missing_forecast, 1);
    }

    // ============================================================
    // Exclusion window
    // ============================================================

    #[test]
    fn points_inside_exclusion_windows_are_dropped() {
        let config = AlignmentConfig {
            exclude_first_seconds: 60,
            exclude_last_seconds: 60,
            ..AlignmentConfig::default()
        };
        let aligner = SnapshotAligner::new(config);
        let meta = EventMeta::new("evt-1").with_schedule(1_000, 600);

        let rows = [
            full_row(1_030),  // within first 60s
            full_row(1_300),  // mid-event, kept
            full_row(1_570),  // within last 60s (end = 1600)
        ];

        let (timeline, stats) = aligner.align(&meta, &rows);
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.points[0].timestamp, 1_300);
        assert_eq!(stats.dropped_excluded_window, 2);
    }

    #[test]
    fn exclusion_needs_event_start() {
        let config = AlignmentConfig {
            exclude_first_seconds: 60,
            exclude_last_seconds: 60,
            ..AlignmentConfig::default()
        };
        let aligner = SnapshotAligner::new(config);
        let meta = EventMeta::new("evt-1");

        let (timeline, stats) = aligner.align(&meta, &[full_row(5)]);
        assert_eq!(timeline.len(), 1);
        assert_eq!(stats.dropped_excluded_window, 0);
    }

    // ============================================================
    // Ordering
    // ============================================================

    #[test]
    fn points_are_sorted_ascending_by_timestamp() {
        let meta = EventMeta::new("evt-1");
        let rows = [full_row(30), full_row(10), full_row(20)];

        let (timeline, _) = aligner().align(&meta, &rows);
        let timestamps: Vec<i64> = timeline.points.iter().map(|p| p.timestamp).collect();
        assert_eq!(timestamps, vec![10, 20, 30]);
    }

    #[test]
    fn duplicate_timestamps_are_deduplicated() {
        let meta = EventMeta::new("evt-1");
        let rows = [full_row(10), full_row(10), full_row(20)];

        let (timeline, stats) = aligner().align(&meta, &rows);
        assert_eq!(timeline.len(), 2);
        assert_eq!(stats.dropped_duplicate_timestamp, 1);
    }

    // ============================================================
    // Stats
    // ============================================================

    #[test]
    fn stats_merge_accumulates_counters() {
        let mut a = AlignmentStats {
            total_rows: 3,
            kept: 2,
            dropped_missing_quote: 1,
            ..AlignmentStats::default()
        };
        let b = AlignmentStats {
            total_rows: 5,
            kept: 4,
            complement_warnings: 2,
            dropped_missing_quote: 1,
            ..AlignmentStats::default()
        };

        a.merge(&b);
        assert_eq!(a.total_rows, 8);
        assert_eq!(a.kept, 6);
        assert_eq!(a.dropped_missing_quote, 2);
        assert_eq!(a.complement_warnings, 2);
        assert_eq!(a.dropped(), 2);
    }
}
