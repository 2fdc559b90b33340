//! Aligned per-event timelines consumed by the trade simulator.

use oddsgap_core::{EventOutcome, GamePhase};
use serde::{Deserialize, Serialize};

/// One normalized timeline sample.
///
/// Post-alignment, `forecast_prob` and `market_mid` are always present and
/// in `[0, 1]`; bid/ask survive only when the selected quote side carried
/// them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedPoint {
    /// Sample time, unix seconds.
    pub timestamp: i64,
    /// Forecast probability of the home outcome.
    pub forecast_prob: f64,
    /// Market mid price in home-probability space.
    pub market_mid: f64,
    pub market_bid: Option<f64>,
    pub market_ask: Option<f64>,
}

/// Time-ordered sequence of aligned points for one event.
///
/// Immutable once built; strictly ascending by timestamp. An empty timeline
/// is valid and simulates to zero trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTimeline {
    pub event_id: String,
    pub points: Vec<AlignedPoint>,
    pub event_start: Option<i64>,
    pub duration_seconds: Option<i64>,
    /// Final winner label; carried for stratification, never for P&L.
    pub realized_outcome: EventOutcome,
}

impl EventTimeline {
    /// Creates an empty timeline for an event.
    #[must_use]
    pub fn empty(event_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            points: Vec::new(),
            event_start: None,
            duration_seconds: None,
            realized_outcome: EventOutcome::Unknown,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Buckets a timestamp into thirds of the scheduled duration.
    ///
    /// Falls back to `Mid` when the event carries no schedule metadata, so
    /// unlabeled events land in the neutral bucket.
    #[must_use]
    pub fn phase_at(&self, timestamp: i64) -> GamePhase {
        let (Some(start), Some(duration)) = (self.event_start, self.duration_seconds) else {
            return GamePhase::Mid;
        };
        if duration <= 0 {
            return GamePhase::Mid;
        }
        let elapsed = (timestamp - start) as f64 / duration as f64;
        if elapsed < 1.0 / 3.0 {
            GamePhase::Early
        } else if elapsed < 2.0 / 3.0 {
            GamePhase::Mid
        } else {
            GamePhase::Late
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline_with_schedule() -> EventTimeline {
        EventTimeline {
            event_id: "evt-1".to_string(),
            points: Vec::new(),
            event_start: Some(1_000),
            duration_seconds: Some(3_600),
            realized_outcome: EventOutcome::Unknown,
        }
    }

    #[test]
    fn empty_timeline_has_no_points() {
        let timeline = EventTimeline::empty("evt-1");
        assert!(timeline.is_empty());
        assert_eq!(timeline.len(), 0);
    }

    #[test]
    fn phase_buckets_by_elapsed_thirds() {
        let timeline = timeline_with_schedule();
        assert_eq!(timeline.phase_at(1_000), GamePhase::Early);
        assert_eq!(timeline.phase_at(1_000 + 1_199), GamePhase::Early);
        assert_eq!(timeline.phase_at(1_000 + 1_200), GamePhase::Mid);
        assert_eq!(timeline.phase_at(1_000 + 2_400), GamePhase::Late);
        assert_eq!(timeline.phase_at(1_000 + 9_999), GamePhase::Late);
    }

    #[test]
    fn phase_without_schedule_is_mid() {
        let timeline = EventTimeline::empty("evt-1");
        assert_eq!(timeline.phase_at(12345), GamePhase::Mid);
    }

    #[test]
    fn timeline_serialization_roundtrip() {
        let mut timeline = timeline_with_schedule();
        timeline.points.push(AlignedPoint {
            timestamp: 1_500,
            forecast_prob: 0.62,
            market_mid: 0.55,
            market_bid: Some(0.54),
            market_ask: None,
        });

        let json = serde_json::to_string(&timeline).unwrap();
        let back: EventTimeline = serde_json::from_str(&json).unwrap();

        assert_eq!(back, timeline);
        assert_eq!(back.points[0].market_ask, None);
    }
}
