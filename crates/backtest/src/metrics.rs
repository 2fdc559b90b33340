//! Per-combination, per-split metric aggregation.

use oddsgap_core::wilson_ci;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::sim::Trade;

/// Folded results of all trades one combination produced in one split.
///
/// Write-once: computed by [`CombinationMetrics::from_trades`] and never
/// mutated. Trades must be supplied in the deterministic fold order (events
/// sorted by id, ticks in timeline order) so the equity-path metrics are
/// reproducible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinationMetrics {
    pub trade_count: u32,
    pub wins: u32,
    pub losses: u32,
    pub gross_profit: Decimal,
    pub net_profit: Decimal,
    pub total_fees: Decimal,
    pub total_slippage: Decimal,
    /// Wins over decided (non-zero net) trades.
    pub win_rate: f64,
    /// Gross winnings over gross losses; `None` when there are no losing
    /// trades to divide by.
    pub profit_factor: Option<f64>,
    /// Largest peak-to-trough drop of cumulative net profit.
    pub max_drawdown: Decimal,
    pub avg_hold_seconds: f64,
    /// Wilson 95% CI on the win rate; diagnostic only.
    pub wilson_ci_lower: f64,
    pub wilson_ci_upper: f64,
    /// Whether the combination cleared the minimum trade count.
    pub is_valid: bool,
}

impl CombinationMetrics {
    /// Folds trades into metrics.
    #[must_use]
    pub fn from_trades(trades: &[Trade], min_trade_count: u32) -> Self {
        if trades.is_empty() {
            return Self::empty();
        }

        let trade_count = trades.len() as u32;
        let wins = trades
            .iter()
            .filter(|t| t.net_profit > Decimal::ZERO)
            .count() as u32;
        let losses = trades
            .iter()
            .filter(|t| t.net_profit < Decimal::ZERO)
            .count() as u32;

        let gross_profit: Decimal = trades.iter().map(|t| t.gross_profit).sum();
        let net_profit: Decimal = trades.iter().map(|t| t.net_profit).sum();
        let total_fees: Decimal = trades.iter().map(|t| t.fees).sum();
        let total_slippage: Decimal = trades.iter().map(|t| t.slippage).sum();

        let decided = wins + losses;
        let win_rate = if decided > 0 {
            f64::from(wins) / f64::from(decided)
        } else {
            0.0
        };

        let winnings: Decimal = trades
            .iter()
            .filter(|t| t.net_profit > Decimal::ZERO)
            .map(|t| t.net_profit)
            .sum();
        let losings: Decimal = trades
            .iter()
            .filter(|t| t.net_profit < Decimal::ZERO)
            .map(|t| -t.net_profit)
            .sum();
        let profit_factor = if losings > Decimal::ZERO {
            let w = f64::try_from(winnings).unwrap_or(0.0);
            let l = f64::try_from(losings).unwrap_or(0.0);
            (l > 0.0).then(|| w / l)
        } else {
            None
        };

        let total_hold: i64 = trades.iter().map(Trade::hold_seconds).sum();
        let avg_hold_seconds = total_hold as f64 / f64::from(trade_count);

        let (wilson_ci_lower, wilson_ci_upper) = wilson_ci(wins as usize, decided as usize, 1.96);

        Self {
            trade_count,
            wins,
            losses,
            gross_profit,
            net_profit,
            total_fees,
            total_slippage,
            win_rate,
            profit_factor,
            max_drawdown: max_drawdown(trades),
            avg_hold_seconds,
            wilson_ci_lower,
            wilson_ci_upper,
            is_valid: trade_count >= min_trade_count,
        }
    }

    /// Metrics for a combination/split that produced no trades.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            trade_count: 0,
            wins: 0,
            losses: 0,
            gross_profit: Decimal::ZERO,
            net_profit: Decimal::ZERO,
            total_fees: Decimal::ZERO,
            total_slippage: Decimal::ZERO,
            win_rate: 0.0,
            profit_factor: None,
            max_drawdown: Decimal::ZERO,
            avg_hold_seconds: 0.0,
            wilson_ci_lower: 0.0,
            wilson_ci_upper: 0.0,
            is_valid: false,
        }
    }
}

/// Maximum drawdown of the cumulative net-profit path, in fold order.
fn max_drawdown(trades: &[Trade]) -> Decimal {
    let mut equity = Decimal::ZERO;
    let mut peak = Decimal::ZERO;
    let mut max_dd = Decimal::ZERO;

    for trade in trades {
        equity += trade.net_profit;
        if equity > peak {
            peak = equity;
        }
        let drawdown = peak - equity;
        if drawdown > max_dd {
            max_dd = drawdown;
        }
    }

    max_dd
}
