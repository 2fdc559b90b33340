//! Core types, configuration, and validation for the oddsgap backtester.
//!
//! This crate provides:
//! - The validated configuration surface shared by all components
//! - The configuration error taxonomy (fail-fast, field-specific)
//! - Shared enums for positions, splits, game phases, and event outcomes
//! - Statistical helpers used by metric aggregation

pub mod config;
pub mod config_loader;
pub mod error;
pub mod stats;
pub mod types;

pub use config::{
    AlignmentConfig, BacktestConfig, ExecutionConfig, ForecastSource, GridConfig, SplitConfig,
};
pub use config_loader::ConfigLoader;
pub use error::ConfigError;
pub use stats::wilson_ci;
pub use types::{EventOutcome, GamePhase, Side, Split};
