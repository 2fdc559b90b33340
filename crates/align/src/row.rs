//! Raw per-event snapshot rows as delivered by the data source.
//!
//! Every value that can be absent is an `Option`; no numeric sentinel ever
//! stands in for "missing".

use oddsgap_core::EventOutcome;
use serde::{Deserialize, Serialize};

/// One raw sample for one event, prior to alignment.
///
/// Quote values may arrive as probabilities in `[0, 1]` or as percentages in
/// `(1, 100]`; the aligner normalizes both. The away-denominated quote is
/// assumed to be already converted into home-probability space upstream and
/// is never inverted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    /// Sample time, unix seconds.
    pub timestamp: i64,
    /// Primary live win-probability for the home side.
    pub forecast_prob: Option<f64>,
    /// Optional external model probability for the same point.
    pub model_prob: Option<f64>,
    /// Home-denominated market quote.
    pub home_mid: Option<f64>,
    pub home_bid: Option<f64>,
    pub home_ask: Option<f64>,
    /// Away-denominated market quote, pre-converted to home space.
    pub away_mid: Option<f64>,
    pub away_bid: Option<f64>,
    pub away_ask: Option<f64>,
}

impl SnapshotRow {
    /// Creates an empty row at the given timestamp.
    #[must_use]
    pub fn at(timestamp: i64) -> Self {
        Self {
            timestamp,
            forecast_prob: None,
            model_prob: None,
            home_mid: None,
            home_bid: None,
            home_ask: None,
            away_mid: None,
            away_bid: None,
            away_ask: None,
        }
    }

    /// Sets the primary forecast probability.
    #[must_use]
    pub fn with_forecast(mut self, prob: f64) -> Self {
        self.forecast_prob = Some(prob);
        self
    }

    /// Sets the home-denominated quote.
    #[must_use]
    pub fn with_home_quote(mut self, mid: f64, bid: Option<f64>, ask: Option<f64>) -> Self {
        self.home_mid = Some(mid);
        self.home_bid = bid;
        self.home_ask = ask;
        self
    }

    /// Sets the away-denominated quote.
    #[must_use]
    pub fn with_away_quote(mut self, mid: f64, bid: Option<f64>, ask: Option<f64>) -> Self {
        self.away_mid = Some(mid);
        self.away_bid = bid;
        self.away_ask = ask;
        self
    }
}

/// Event-level metadata accompanying a row set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    pub event_id: String,
    /// Event start, unix seconds, when known.
    pub event_start: Option<i64>,
    /// Scheduled duration, when known.
    pub duration_seconds: Option<i64>,
    /// Final winner; labeling only, never used for P&L.
    pub realized_outcome: EventOutcome,
}

impl EventMeta {
    /// Creates metadata with no schedule information.
    #[must_use]
    pub fn new(event_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            event_start: None,
            duration_seconds: None,
            realized_outcome: EventOutcome::Unknown,
        }
    }

    /// Sets start and duration.
    #[must_use]
    pub fn with_schedule(mut self, event_start: i64, duration_seconds: i64) -> Self {
        self.event_start = Some(event_start);
        self.duration_seconds = Some(duration_seconds);
        self
    }

    /// Sets the realized outcome label.
    #[must_use]
    pub fn with_outcome(mut self, outcome: EventOutcome) -> Self {
        self.realized_outcome = outcome;
        self
    }
}
