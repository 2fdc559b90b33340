//! Configuration error taxonomy.
//!
//! Every variant names the offending field so a bad run fails fast with an
//! actionable message before any simulation work begins.

use thiserror::Error;

/// A configuration value that fails validation.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("split ratios must sum to 1.0, got {sum} (train={train}, validation={validation}, test={test})")]
    RatioSum {
        train: f64,
        validation: f64,
        test: f64,
        sum: f64,
    },

    #[error("split ratio '{field}' must be in [0, 1], got {value}")]
    RatioOutOfRange { field: &'static str, value: f64 },

    #[error("entry_min must be > 0, got {value}")]
    NonPositiveEntryMin { value: f64 },

    #[error("exit_min must be >= 0, got {value}")]
    NegativeExitMin { value: f64 },

    #[error("{field}: range is inverted, min {min} > max {max}")]
    InvertedRange {
        field: &'static str,
        min: f64,
        max: f64,
    },

    #[error("{field} must be > 0, got {value}")]
    NonPositiveStep { field: &'static str, value: f64 },

    #[error("threshold ranges produce no combinations with exit < entry")]
    EmptyGrid,

    #[error("{field} must be >= 0, got {value}")]
    NegativeRate { field: &'static str, value: f64 },

    #[error("bet_amount must be > 0, got {value}")]
    NonPositiveBetAmount { value: String },

    #[error("{field} must be >= 0, got {value}")]
    NegativeSeconds { field: &'static str, value: i64 },

    #[error("top_n must be >= 1")]
    ZeroTopN,

    #[error("worker_count must be >= 1")]
    ZeroWorkerCount,
}
