//! The fixed selection policy over evaluated combinations.
//!
//! Rank by train net profit, shortlist the top N, then pick the shortlist
//! member with the best validation net profit. Test metrics ride along for
//! reporting and are never consulted.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::grid::GridCombination;
use crate::metrics::CombinationMetrics;
use crate::orchestrator::CombinationRow;

/// Name of the selection policy, recorded in every selection report.
pub const SELECTION_METHOD: &str = "top_n_train_then_validation";

/// The chosen combination and the evidence behind it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionReport {
    pub combination: GridCombination,
    pub method: String,
    /// The shortlist size the policy ran with.
    pub top_n: usize,
    /// How many combinations were eligible (valid train metrics).
    pub candidates: usize,
    pub train: CombinationMetrics,
    pub validation: CombinationMetrics,
    /// Reported for completeness; never used in the choice.
    pub test: CombinationMetrics,
}

/// Applies the selection policy to evaluated rows.
///
/// Only combinations whose train metrics cleared the minimum trade count
/// participate. Returns `None` when nothing is eligible. Ties rank
/// deterministically by `(entry, exit)` so repeated runs always agree.
#[must_use]
pub fn select_best(rows: &[CombinationRow], top_n: usize) -> Option<SelectionReport> {
    let mut candidates: Vec<&CombinationRow> = rows.iter().filter(|r| r.train.is_valid).collect();
    if candidates.is_empty() {
        return None;
    }
    let eligible = candidates.len();

    candidates.sort_by(|a, b| {
        b.train
            .net_profit
            .cmp(&a.train.net_profit)
            .then_with(|| total_cmp(a.combination.entry_threshold, b.combination.entry_threshold))
            .then_with(|| total_cmp(a.combination.exit_threshold, b.combination.exit_threshold))
    });
    candidates.truncate(top_n);

    // Max over validation profit; on ties the better train rank wins
    // because the scan preserves shortlist order.
    let best = candidates
        .iter()
        .reduce(|best, row| {
            if row.validation.net_profit > best.validation.net_profit {
                row
            } else {
                best
            }
        })?;

    info!(
        entry = best.combination.entry_threshold,
        exit = best.combination.exit_threshold,
        train_net = %best.train.net_profit,
        validation_net = %best.validation.net_profit,
        "selected combination"
    );

    Some(SelectionReport {
        combination: best.combination,
        method: SELECTION_METHOD.to_string(),
        top_n,
        candidates: eligible,
        train: best.train.clone(),
        validation: best.validation.clone(),
        test: best.test.clone(),
    })
}

fn total_cmp(a: f64, b: f64) -> std::cmp::Ordering {
    a.total_cmp(&b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    // ============================================================
    // Test Helpers
    // ============================================================

    fn metrics_with_net(net: Decimal, valid: bool) -> CombinationMetrics {
        CombinationMetrics {
            trade_count: if valid { 50 } else { 1 },
            net_profit: net,
            is_valid: valid,
            ..CombinationMetrics::empty()
        }
    }

    fn row(entry: f64, exit: f64, train: Decimal, validation: Decimal, test: Decimal) -> CombinationRow {
        CombinationRow {
            combination: GridCombination {
                entry_threshold: entry,
                exit_threshold: exit,
            },
            train: metrics_with_net(train, true),
            validation: metrics_with_net(validation, true),
            test: metrics_with_net(test, true),
        }
    }

    // ============================================================
    // Policy behavior
    // ============================================================

    #[test]
    fn best_validation_inside_top_n_wins_over_best_train() {
        // A has the best train profit; B is within the top 2 and has the
        // best validation profit. The policy must pick B.
        let rows = vec![
            row(0.05, 0.01, dec!(100), dec!(10), dec!(1)), // A
            row(0.06, 0.01, dec!(90), dec!(40), dec!(2)),  // B
            row(0.07, 0.01, dec!(10), dec!(99), dec!(3)),  // outside top 2
        ];

        let report = select_best(&rows, 2).unwrap();
        assert!((report.combination.entry_threshold - 0.06).abs() < 1e-12);
        assert_eq!(report.validation.net_profit, dec!(40));
    }

    #[test]
    fn test_metrics_are_reported_but_never_drive_the_choice() {
        // The loser has a spectacular test profit; it must not matter.
        let rows = vec![
            row(0.05, 0.01, dec!(100), dec!(50), dec!(-5)),
            row(0.06, 0.01, dec!(95), dec!(10), dec!(1000)),
        ];

        let report = select_best(&rows, 2).unwrap();
        assert!((report.combination.entry_threshold - 0.05).abs() < 1e-12);
        assert_eq!(report.test.net_profit, dec!(-5));
    }

    #[test]
    fn shortlist_is_limited_to_top_n_by_train() {
        // The best validation profit sits at train rank 3; with top_n = 2
        // it must not be considered.
        let rows = vec![
            row(0.05, 0.01, dec!(100), dec!(20), dec!(0)),
            row(0.06, 0.01, dec!(90), dec!(30), dec!(0)),
            row(0.07, 0.01, dec!(80), dec!(500), dec!(0)),
        ];

        let report = select_best(&rows, 2).unwrap();
        assert!((report.combination.entry_threshold - 0.06).abs() < 1e-12);
    }

    #[test]
    fn invalid_train_metrics_are_not_candidates() {
        let mut thin = row(0.05, 0.01, dec!(1000), dec!(1000), dec!(0));
        thin.train = metrics_with_net(dec!(1000), false);
        let rows = vec![thin, row(0.06, 0.01, dec!(10), dec!(5), dec!(0))];

        let report = select_best(&rows, 5).unwrap();
        assert!((report.combination.entry_threshold - 0.06).abs() < 1e-12);
        assert_eq!(report.candidates, 1);
    }

    #[test]
    fn no_eligible_rows_yields_none() {
        let mut thin = row(0.05, 0.01, dec!(10), dec!(10), dec!(0));
        thin.train = metrics_with_net(dec!(10), false);
        assert!(select_best(&[thin], 5).is_none());
        assert!(select_best(&[], 5).is_none());
    }

    #[test]
    fn validation_tie_resolves_to_better_train_rank() {
        let rows = vec![
            row(0.05, 0.01, dec!(100), dec!(40), dec!(0)),
            row(0.06, 0.01, dec!(90), dec!(40), dec!(0)),
        ];
        let report = select_best(&rows, 2).unwrap();
        assert!((report.combination.entry_threshold - 0.05).abs() < 1e-12);
    }

    #[test]
    fn report_records_method_and_n() {
        let rows = vec![row(0.05, 0.01, dec!(10), dec!(5), dec!(0))];
        let report = select_best(&rows, 7).unwrap();
        assert_eq!(report.method, SELECTION_METHOD);
        assert_eq!(report.top_n, 7);
    }
}
