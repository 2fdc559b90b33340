//! Divergence trade simulator.
//!
//! A pure function over one event's aligned timeline: replays the
//! Flat/Long/Short state machine for a single `(entry, exit)` threshold
//! pair and returns the trades it produced. All state lives inside one
//! invocation; nothing is shared across events or combinations.
//!
//! Profit is computed strictly from entry/exit execution prices. The
//! event's realized outcome is carried on the timeline for labeling and is
//! never consulted here.

use oddsgap_core::{GamePhase, Side};
use oddsgap_align::{AlignedPoint, EventTimeline};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::costs::{clamp_price, CostModel};
use crate::grid::GridCombination;

/// The prices observed on one leg of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradePrices {
    pub mid: f64,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    /// The price the leg actually executed at (side price, or mid adjusted
    /// by a penalty).
    pub executed: f64,
}

/// One completed round trip. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub side: Side,
    pub entry_time: i64,
    pub exit_time: i64,
    pub entry: TradePrices,
    pub exit: TradePrices,
    pub contracts: Decimal,
    pub gross_profit: Decimal,
    pub fees: Decimal,
    pub slippage: Decimal,
    pub net_profit: Decimal,
    /// Phase of the event at entry; stratification label only.
    pub game_phase: GamePhase,
    /// Entries require a live side quote, so this is structurally false
    /// today; kept so the invariant is visible in the record.
    pub entry_used_penalty: bool,
    pub exit_used_penalty: bool,
}

impl Trade {
    /// Seconds the position was held.
    #[must_use]
    pub fn hold_seconds(&self) -> i64 {
        self.exit_time - self.entry_time
    }
}

/// Simulation output for one event under one combination.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventSimResult {
    pub trades: Vec<Trade>,
    pub gross_profit: Decimal,
    pub net_profit: Decimal,
    pub trade_count: u32,
    /// Share of trades with positive net profit, over trades with non-zero
    /// net profit.
    pub win_rate: f64,
    /// Ticks where an entry threshold fired without the required side quote.
    pub entries_blocked_missing_quote: u32,
}

/// Position state held between ticks of one simulation.
struct OpenPosition {
    side: Side,
    entry_time: i64,
    entry: TradePrices,
    contracts: Decimal,
    entry_fee: Decimal,
    entry_slippage: Decimal,
    game_phase: GamePhase,
}

/// Replays one event timeline through the divergence state machine.
///
/// The timeline must be strictly ascending by timestamp (the aligner's
/// contract). An empty timeline yields zero trades.
#[must_use]
pub fn simulate_event(
    timeline: &EventTimeline,
    combination: GridCombination,
    costs: &CostModel,
    min_hold_seconds: i64,
) -> EventSimResult {
    let mut position: Option<OpenPosition> = None;
    let mut prev_divergence: Option<f64> = None;
    let mut prev_abs_divergence: Option<f64> = None;
    let mut trades: Vec<Trade> = Vec::new();
    let mut blocked: u32 = 0;

    for point in &timeline.points {
        let divergence = point.forecast_prob - point.market_mid;

        match position.take() {
            None => {
                position = try_enter(
                    timeline,
                    point,
                    divergence,
                    prev_divergence,
                    combination.entry_threshold,
                    costs,
                    &mut blocked,
                );
            }
            Some(open) => {
                let crossed_inside = divergence.abs() < combination.exit_threshold
                    && prev_abs_divergence
                        .map_or(false, |prev| prev >= combination.exit_threshold);
                let held_long_enough = point.timestamp - open.entry_time >= min_hold_seconds;

                if crossed_inside && held_long_enough {
                    trades.push(close_position(open, point, costs, false));
                } else {
                    position = Some(open);
                }
            }
        }

        prev_divergence = Some(divergence);
        prev_abs_divergence = Some(divergence.abs());
    }

    // Timeline ended with a position open: forced close at the last point,
    // modeling end-of-event liquidity collapse.
    if let Some(open) = position {
        if let Some(last) = timeline.points.last() {
            trades.push(close_position(open, last, costs, true));
        }
    }

    fold_result(trades, blocked)
}

/// Evaluates entry conditions from `Flat` at one tick.
///
/// The "divergence is widening" check is deliberately permissive on the
/// first tick: with no previous sample to compare, the tick qualifies.
fn try_enter(
    timeline: &EventTimeline,
    point: &AlignedPoint,
    divergence: f64,
    prev_divergence: Option<f64>,
    entry_threshold: f64,
    costs: &CostModel,
    blocked: &mut u32,
) -> Option<OpenPosition> {
    let (side, side_price) = if divergence > entry_threshold
        && prev_divergence.map_or(true, |prev| divergence > prev)
    {
        (Side::Long, point.market_ask)
    } else if divergence < -entry_threshold
        && prev_divergence.map_or(true, |prev| divergence < prev)
    {
        (Side::Short, point.market_bid)
    } else {
        return None;
    };

    let Some(raw_price) = side_price else {
        // Signal fired but the required side quote is missing; re-evaluated
        // on the next tick.
        *blocked += 1;
        debug!(
            event_id = %timeline.event_id,
            timestamp = point.timestamp,
            ?side,
            "entry signal without required side quote"
        );
        return None;
    };

    let executed = clamp_price(raw_price)?;
    let Some(contracts) = costs.contracts_for(side, executed) else {
        // Sizing guard (ask at 0 for a long, bid at 1 for a short): no
        // trade, not an error.
        *blocked += 1;
        debug!(
            event_id = %timeline.event_id,
            timestamp = point.timestamp,
            ?side,
            price = executed,
            "entry blocked by sizing guard"
        );
        return None;
    };

    let entry = TradePrices {
        mid: point.market_mid,
        bid: point.market_bid,
        ask: point.market_ask,
        executed,
    };
    Some(OpenPosition {
        side,
        entry_time: point.timestamp,
        entry,
        contracts,
        entry_fee: costs.fee_for_leg(executed, contracts),
        entry_slippage: costs.slippage_for_leg(executed, contracts, false),
        game_phase: timeline.phase_at(point.timestamp),
    })
}

/// Closes a position at `point` and materializes the trade record.
///
/// A normal exit executes at the side opposite the entry (bid closes a
/// long, ask closes a short), falling back to the mid adjusted by the
/// fallback penalty when that side is missing. A forced close always
/// executes at the mid adjusted by the larger forced penalty.
fn close_position(
    open: OpenPosition,
    point: &AlignedPoint,
    costs: &CostModel,
    forced: bool,
) -> Trade {
    let (raw_price, used_penalty) = if forced {
        (penalized_mid(open.side, point.market_mid, costs.forced_exit_penalty), true)
    } else {
        let closing_side = match open.side {
            Side::Long => point.market_bid,
            Side::Short => point.market_ask,
        };
        match closing_side {
            Some(price) => (price, false),
            None => (
                penalized_mid(open.side, point.market_mid, costs.fallback_exit_penalty),
                true,
            ),
        }
    };

    let executed = clamp_price(raw_price).unwrap_or_else(|| {
        warn!(
            timestamp = point.timestamp,
            "non-finite exit price; executing at clamped mid"
        );
        point.market_mid.clamp(0.0, 1.0)
    });

    let exit = TradePrices {
        mid: point.market_mid,
        bid: point.market_bid,
        ask: point.market_ask,
        executed,
    };

    let exit_fee = costs.fee_for_leg(executed, open.contracts);
    let exit_slippage = costs.slippage_for_leg(executed, open.contracts, used_penalty);

    let gross_profit = gross_for(open.side, open.entry.executed, executed, open.contracts);
    let fees = open.entry_fee + exit_fee;
    let slippage = open.entry_slippage + exit_slippage;
    let net_profit = gross_profit - fees - slippage;

    Trade {
        side: open.side,
        entry_time: open.entry_time,
        exit_time: point.timestamp,
        entry: open.entry,
        exit,
        contracts: open.contracts,
        gross_profit,
        fees,
        slippage,
        net_profit,
        game_phase: open.game_phase,
        entry_used_penalty: false,
        exit_used_penalty: used_penalty,
    }
}

/// A penalty always worsens the execution: a long sells lower, a short
/// buys back higher.
fn penalized_mid(side: Side, mid: f64, penalty: f64) -> f64 {
    match side {
        Side::Long => mid - penalty,
        Side::Short => mid + penalty,
    }
}

/// Price movement P&L between the two executed legs.
fn gross_for(side: Side, entry_price: f64, exit_price: f64, contracts: Decimal) -> Decimal {
    let (Some(entry), Some(exit)) = (
        Decimal::from_f64(entry_price),
        Decimal::from_f64(exit_price),
    ) else {
        warn!(entry_price, exit_price, "non-finite execution price; zero P&L");
        return Decimal::ZERO;
    };
    match side {
        Side::Long => contracts * (exit - entry),
        Side::Short => contracts * (entry - exit),
    }
}

fn fold_result(trades: Vec<Trade>, blocked: u32) -> EventSimResult {
    let gross_profit: Decimal = trades.iter().map(|t| t.gross_profit).sum();
    let net_profit: Decimal = trades.iter().map(|t| t.net_profit).sum();
    let wins = trades.iter().filter(|t| t.net_profit > Decimal::ZERO).count();
    let losses = trades.iter().filter(|t| t.net_profit < Decimal::ZERO).count();
    let decided = wins + losses;
    let win_rate = if decided > 0 {
        wins as f64 / decided as f64
    } else {
        0.0
    };

    EventSimResult {
        trade_count: trades.len() as u32,
        trades,
        gross_profit,
        net_profit,
        win_rate,
        entries_blocked_missing_quote: blocked,
    }
}
