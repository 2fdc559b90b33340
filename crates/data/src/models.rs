//! Database records and their conversions into aligner inputs.

use chrono::{DateTime, Utc};
use oddsgap_align::{EventMeta, SnapshotRow};
use oddsgap_core::EventOutcome;
use serde::{Deserialize, Serialize};

/// One stored snapshot row for an event.
///
/// Quote columns are nullable: the feeds rarely deliver every side on
/// every sample.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SnapshotRecord {
    pub event_id: String,
    pub snapshot_time: DateTime<Utc>,
    pub forecast_prob: Option<f64>,
    pub model_prob: Option<f64>,
    pub home_mid: Option<f64>,
    pub home_bid: Option<f64>,
    pub home_ask: Option<f64>,
    pub away_mid: Option<f64>,
    pub away_bid: Option<f64>,
    pub away_ask: Option<f64>,
}

impl SnapshotRecord {
    /// Converts the record into an aligner row.
    #[must_use]
    pub fn into_row(self) -> SnapshotRow {
        SnapshotRow {
            timestamp: self.snapshot_time.timestamp(),
            forecast_prob: self.forecast_prob,
            model_prob: self.model_prob,
            home_mid: self.home_mid,
            home_bid: self.home_bid,
            home_ask: self.home_ask,
            away_mid: self.away_mid,
            away_bid: self.away_bid,
            away_ask: self.away_ask,
        }
    }
}

/// Stored event metadata.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventRecord {
    pub event_id: String,
    pub start_time: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    /// Final winner as stored: "home", "away", or NULL while unsettled.
    pub winner: Option<String>,
}

impl EventRecord {
    /// Converts the record into aligner metadata.
    #[must_use]
    pub fn into_meta(self) -> EventMeta {
        let outcome = match self.winner.as_deref() {
            Some("home") => EventOutcome::Home,
            Some("away") => EventOutcome::Away,
            _ => EventOutcome::Unknown,
        };
        EventMeta {
            event_id: self.event_id,
            event_start: self.start_time.map(|t| t.timestamp()),
            duration_seconds: self.duration_seconds,
            realized_outcome: outcome,
        }
    }
}
