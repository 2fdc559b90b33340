//! Cost model: quadratic fees, flat slippage, and risk-neutral sizing.
//!
//! Stateless and shared by every simulator invocation. Monetary amounts are
//! `Decimal`; quoted prices arrive as `f64` and are clamped to `[0, 1]`
//! before any cost or sizing computation. Non-finite inputs become zero
//! cost or no trade, never a NaN in an aggregate.

use oddsgap_core::{ExecutionConfig, Side};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::warn;

/// Fee, slippage, penalty, and sizing parameters for one run.
#[derive(Debug, Clone)]
pub struct CostModel {
    bet_amount: Decimal,
    enable_fees: bool,
    fee_rate: Decimal,
    slippage_rate: Decimal,
    /// Price adjustment when a normal exit falls back to the mid.
    pub fallback_exit_penalty: f64,
    /// Price adjustment for a forced end-of-timeline close.
    pub forced_exit_penalty: f64,
}

impl CostModel {
    #[must_use]
    pub fn new(config: &ExecutionConfig) -> Self {
        Self {
            bet_amount: config.bet_amount,
            enable_fees: config.enable_fees,
            fee_rate: decimal_or_zero(config.fee_rate, "fee_rate"),
            slippage_rate: decimal_or_zero(config.slippage_rate, "slippage_rate"),
            fallback_exit_penalty: config.fallback_exit_penalty,
            forced_exit_penalty: config.forced_exit_penalty,
        }
    }

    /// Flat stake risked per trade.
    #[must_use]
    pub fn bet_amount(&self) -> Decimal {
        self.bet_amount
    }

    /// Risk-neutral contract count for an entry at `price`.
    ///
    /// Long risks the ask per contract (`bet / ask`); short risks the
    /// complement (`bet / (1 - bid)`). Either way the maximum possible loss
    /// is exactly `bet_amount`. Returns `None` when the division guard
    /// trips (ask at 0 for a long, bid at 1 for a short): no trade, not an
    /// error.
    #[must_use]
    pub fn contracts_for(&self, side: Side, price: f64) -> Option<Decimal> {
        let price = clamp_price(price)?;
        let risk_per_contract = match side {
            Side::Long => price,
            Side::Short => 1.0 - price,
        };
        if risk_per_contract <= 0.0 {
            return None;
        }
        let risk = Decimal::from_f64(risk_per_contract)?;
        if risk <= Decimal::ZERO {
            return None;
        }
        Some(self.bet_amount / risk)
    }

    /// Fee for one leg: `fee_rate * p * (1 - p) * contracts * p`.
    ///
    /// The dollar volume is the leg's actually-traded notional, so fees
    /// scale with the execution price rather than the flat stake. Zero at
    /// the price extremes and when fees are disabled.
    #[must_use]
    pub fn fee_for_leg(&self, price: f64, contracts: Decimal) -> Decimal {
        if !self.enable_fees {
            return Decimal::ZERO;
        }
        let Some(price) = clamp_price(price) else {
            return Decimal::ZERO;
        };
        if price <= 0.0 || price >= 1.0 {
            return Decimal::ZERO;
        }
        let Some(p) = Decimal::from_f64(price) else {
            warn!(price, "price failed decimal conversion; charging no fee");
            return Decimal::ZERO;
        };
        let leg_dollar_volume = contracts * p;
        self.fee_rate * p * (Decimal::ONE - p) * leg_dollar_volume
    }

    /// Flat slippage on the leg's dollar volume.
    ///
    /// A leg that already paid a price penalty is exempt: penalty and
    /// slippage are mutually exclusive execution costs.
    #[must_use]
    pub fn slippage_for_leg(&self, price: f64, contracts: Decimal, used_penalty: bool) -> Decimal {
        if used_penalty || self.slippage_rate.is_zero() {
            return Decimal::ZERO;
        }
        let Some(price) = clamp_price(price) else {
            return Decimal::ZERO;
        };
        let Some(p) = Decimal::from_f64(price) else {
            warn!(price, "price failed decimal conversion; charging no slippage");
            return Decimal::ZERO;
        };
        self.slippage_rate * contracts * p
    }
}

/// Clamps a price to `[0, 1]`; `None` for non-finite input.
#[must_use]
pub fn clamp_price(price: f64) -> Option<f64> {
    if !price.is_finite() {
        warn!(price, "non-finite price encountered");
        return None;
    }
    Some(price.clamp(0.0, 1.0))
}

fn decimal_or_zero(value: f64, field: &str) -> Decimal {
    match Decimal::from_f64(value) {
        Some(d) => d,
        None => {
            warn!(field, value, "non-finite rate treated as zero");
            Decimal::ZERO
        }
    }
}
