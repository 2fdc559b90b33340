//! Shared enums used across the aligner, simulator, and orchestrator.

use serde::{Deserialize, Serialize};

/// Side of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    /// Holding the outcome (bought at the ask, profits when price rises).
    Long,
    /// Against the outcome (sold at the bid, profits when price falls).
    Short,
}

/// Dataset partition an event id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Split {
    Train,
    Validation,
    Test,
}

impl Split {
    /// All splits in their canonical evaluation order.
    pub const ALL: [Self; 3] = [Self::Train, Self::Validation, Self::Test];

    /// Lowercase label used in output tables.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Validation => "validation",
            Self::Test => "test",
        }
    }
}

/// Coarse bucket of an event's elapsed time.
///
/// Used only for labeling trades in result stratification, never for
/// trading decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Early,
    Mid,
    Late,
}

/// Realized final outcome of an event.
///
/// Carried on timelines for labeling only; profit is computed from price
/// movement and never consults this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventOutcome {
    Home,
    Away,
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_labels_are_lowercase() {
        assert_eq!(Split::Train.as_str(), "train");
        assert_eq!(Split::Validation.as_str(), "validation");
        assert_eq!(Split::Test.as_str(), "test");
    }

    #[test]
    fn split_all_is_train_validation_test() {
        assert_eq!(Split::ALL, [Split::Train, Split::Validation, Split::Test]);
    }

    #[test]
    fn side_serializes_as_variant_name() {
        assert_eq!(serde_json::to_string(&Side::Long).unwrap(), r#""Long""#);
        assert_eq!(serde_json::to_string(&Side::Short).unwrap(), r#""Short""#);
    }

    #[test]
    fn event_outcome_deserializes_from_variant_name() {
        let outcome: EventOutcome = serde_json::from_str(r#""Home""#).unwrap();
        assert_eq!(outcome, EventOutcome::Home);
    }
}
