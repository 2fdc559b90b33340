//! Backtest configuration surface.
//!
//! One validated struct replaces ad-hoc optional parameter threading: every
//! knob has a defined default, and `validate` is called once before any
//! simulation work starts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tolerance when checking that split ratios sum to 1.0.
pub const RATIO_SUM_TOLERANCE: f64 = 1e-6;

/// Which field of a snapshot row supplies the forecast probability.
///
/// Resolved once at configuration load; the aligner and simulator never
/// probe rows to infer intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ForecastSource {
    /// The primary live win-probability feed.
    #[default]
    Primary,
    /// An external model's probability, supplied per row.
    Model,
}

/// Threshold grid and search-control parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Inclusive lower bound for entry thresholds (must be > 0).
    pub entry_min: f64,
    /// Inclusive upper bound for entry thresholds.
    pub entry_max: f64,
    /// Step between successive entry thresholds.
    pub entry_step: f64,
    /// Inclusive lower bound for exit thresholds (must be >= 0).
    pub exit_min: f64,
    /// Inclusive upper bound for exit thresholds.
    pub exit_max: f64,
    /// Step between successive exit thresholds.
    pub exit_step: f64,
    /// Minimum train-split trades for a combination to be selectable.
    pub min_trade_count: u32,
    /// How many train-ranked combinations the validation stage considers.
    pub top_n: usize,
    /// Maximum combinations evaluated concurrently.
    pub worker_count: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            entry_min: 0.02,
            entry_max: 0.15,
            entry_step: 0.01,
            exit_min: 0.0,
            exit_max: 0.10,
            exit_step: 0.01,
            min_trade_count: 10,
            top_n: 5,
            worker_count: 4,
        }
    }
}

/// Deterministic train/validation/test partitioning parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    pub train_ratio: f64,
    pub validation_ratio: f64,
    pub test_ratio: f64,
    /// Seed for the split shuffle; same seed + ids + ratios = same split.
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_ratio: 0.70,
            validation_ratio: 0.15,
            test_ratio: 0.15,
            seed: 42,
        }
    }
}

impl SplitConfig {
    /// Sum of the three ratios.
    #[must_use]
    pub fn ratio_sum(&self) -> f64 {
        self.train_ratio + self.validation_ratio + self.test_ratio
    }
}

/// Execution and cost-model parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Flat stake risked per trade, in dollars.
    pub bet_amount: Decimal,
    /// Whether the quadratic fee applies to each leg.
    pub enable_fees: bool,
    /// Fee coefficient in `fee_rate * p * (1 - p) * leg_dollar_volume`.
    pub fee_rate: f64,
    /// Flat slippage rate on leg dollar volume; mutually exclusive with a
    /// price penalty on the same leg.
    pub slippage_rate: f64,
    /// Price adjustment when a normal exit must fall back to the mid.
    pub fallback_exit_penalty: f64,
    /// Price adjustment for a forced end-of-timeline close. Larger than the
    /// fallback penalty: it models end-of-event liquidity collapse.
    pub forced_exit_penalty: f64,
    /// Minimum seconds a position must be held before a normal exit.
    pub min_hold_seconds: i64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            bet_amount: Decimal::new(20, 0),
            enable_fees: true,
            fee_rate: 0.07,
            slippage_rate: 0.0,
            fallback_exit_penalty: 0.02,
            forced_exit_penalty: 0.05,
            min_hold_seconds: 60,
        }
    }
}

/// Timeline construction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentConfig {
    /// Seconds after event start during which points are dropped.
    pub exclude_first_seconds: i64,
    /// Seconds before event end during which points are dropped.
    pub exclude_last_seconds: i64,
    /// Which row field supplies the forecast probability.
    pub forecast_source: ForecastSource,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            exclude_first_seconds: 0,
            exclude_last_seconds: 0,
            forecast_source: ForecastSource::Primary,
        }
    }
}

/// Complete configuration for one grid-search run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub grid: GridConfig,
    pub split: SplitConfig,
    pub execution: ExecutionConfig,
    pub alignment: AlignmentConfig,
}

impl BacktestConfig {
    /// Sets the entry threshold range.
    #[must_use]
    pub fn with_entry_range(mut self, min: f64, max: f64, step: f64) -> Self {
        self.grid.entry_min = min;
        self.grid.entry_max = max;
        self.grid.entry_step = step;
        self
    }

    /// Sets the exit threshold range.
    #[must_use]
    pub fn with_exit_range(mut self, min: f64, max: f64, step: f64) -> Self {
        self.grid.exit_min = min;
        self.grid.exit_max = max;
        self.grid.exit_step = step;
        self
    }

    /// Sets the split ratios.
    #[must_use]
    pub fn with_ratios(mut self, train: f64, validation: f64, test: f64) -> Self {
        self.split.train_ratio = train;
        self.split.validation_ratio = validation;
        self.split.test_ratio = test;
        self
    }

    /// Sets the split seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.split.seed = seed;
        self
    }

    /// Sets the stake per trade.
    #[must_use]
    pub fn with_bet_amount(mut self, bet_amount: Decimal) -> Self {
        self.execution.bet_amount = bet_amount;
        self
    }

    /// Sets the minimum hold time.
    #[must_use]
    pub fn with_min_hold_seconds(mut self, seconds: i64) -> Self {
        self.execution.min_hold_seconds = seconds;
        self
    }

    /// Sets the worker pool size.
    #[must_use]
    pub fn with_worker_count(mut self, workers: usize) -> Self {
        self.grid.worker_count = workers;
        self
    }

    /// Validates every field, naming the first offender found.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] describing the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_split()?;
        self.validate_grid()?;
        self.validate_execution()?;
        self.validate_alignment()?;
        Ok(())
    }

    fn validate_split(&self) -> Result<(), ConfigError> {
        let s = &self.split;
        for (field, value) in [
            ("train_ratio", s.train_ratio),
            ("validation_ratio", s.validation_ratio),
            ("test_ratio", s.test_ratio),
        ] {
            if !(0.0..=1.0).contains(&value) || !value.is_finite() {
                return Err(ConfigError::RatioOutOfRange { field, value });
            }
        }
        let sum = s.ratio_sum();
        if (sum - 1.0).abs() > RATIO_SUM_TOLERANCE {
            return Err(ConfigError::RatioSum {
                train: s.train_ratio,
                validation: s.validation_ratio,
                test: s.test_ratio,
                sum,
            });
        }
        Ok(())
    }

    fn validate_grid(&self) -> Result<(), ConfigError> {
        let g = &self.grid;
        if g.entry_min <= 0.0 {
            return Err(ConfigError::NonPositiveEntryMin { value: g.entry_min });
        }
        if g.exit_min < 0.0 {
            return Err(ConfigError::NegativeExitMin { value: g.exit_min });
        }
        if g.entry_min > g.entry_max {
            return Err(ConfigError::InvertedRange {
                field: "entry threshold",
                min: g.entry_min,
                max: g.entry_max,
            });
        }
        if g.exit_min > g.exit_max {
            return Err(ConfigError::InvertedRange {
                field: "exit threshold",
                min: g.exit_min,
                max: g.exit_max,
            });
        }
        if g.entry_step <= 0.0 {
            return Err(ConfigError::NonPositiveStep {
                field: "entry_step",
                value: g.entry_step,
            });
        }
        if g.exit_step <= 0.0 {
            return Err(ConfigError::NonPositiveStep {
                field: "exit_step",
                value: g.exit_step,
            });
        }
        // The lowest exit must undercut the highest entry or the cross
        // product filters down to nothing.
        if g.exit_min >= g.entry_max {
            return Err(ConfigError::EmptyGrid);
        }
        if g.top_n == 0 {
            return Err(ConfigError::ZeroTopN);
        }
        if g.worker_count == 0 {
            return Err(ConfigError::ZeroWorkerCount);
        }
        Ok(())
    }

    fn validate_execution(&self) -> Result<(), ConfigError> {
        let e = &self.execution;
        if e.bet_amount <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveBetAmount {
                value: e.bet_amount.to_string(),
            });
        }
        for (field, value) in [
            ("fee_rate", e.fee_rate),
            ("slippage_rate", e.slippage_rate),
            ("fallback_exit_penalty", e.fallback_exit_penalty),
            ("forced_exit_penalty", e.forced_exit_penalty),
        ] {
            if value < 0.0 || !value.is_finite() {
                return Err(ConfigError::NegativeRate { field, value });
            }
        }
        if e.min_hold_seconds < 0 {
            return Err(ConfigError::NegativeSeconds {
                field: "min_hold_seconds",
                value: e.min_hold_seconds,
            });
        }
        Ok(())
    }

    fn validate_alignment(&self) -> Result<(), ConfigError> {
        let a = &self.alignment;
        if a.exclude_first_seconds < 0 {
            return Err(ConfigError::NegativeSeconds {
                field: "exclude_first_seconds",
                value: a.exclude_first_seconds,
            });
        }
        if a.exclude_last_seconds < 0 {
            return Err(ConfigError::NegativeSeconds {
                field: "exclude_last_seconds",
                value: a.exclude_last_seconds,
            });
        }
        Ok(())
    }
}
