//! Deterministic train/validation/test partitioning of event ids.

use std::collections::HashMap;

use oddsgap_core::{Split, SplitConfig};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// The computed partition of event ids.
///
/// Membership is decided once per run from `(seed, ratios, ids)` and is
/// bit-identical across runs and process restarts. Per-split id lists are
/// kept sorted so downstream folds walk events in a fixed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitAssignment {
    train: Vec<String>,
    validation: Vec<String>,
    test: Vec<String>,
    #[serde(skip)]
    by_id: HashMap<String, Split>,
}

impl SplitAssignment {
    /// Sorted event ids belonging to a split.
    #[must_use]
    pub fn ids(&self, split: Split) -> &[String] {
        match split {
            Split::Train => &self.train,
            Split::Validation => &self.validation,
            Split::Test => &self.test,
        }
    }

    /// Which split an event id landed in.
    #[must_use]
    pub fn split_of(&self, event_id: &str) -> Option<Split> {
        self.by_id.get(event_id).copied()
    }

    /// Total number of assigned ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.train.len() + self.validation.len() + self.test.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All assigned ids, in split order.
    pub fn all_ids(&self) -> impl Iterator<Item = &String> {
        self.train
            .iter()
            .chain(self.validation.iter())
            .chain(self.test.iter())
    }
}

/// Partitions event ids by seeded shuffle and ratio cut.
///
/// Ids are sorted and deduplicated first so input order never influences
/// the outcome, then shuffled with `ChaCha8Rng` and cut at the configured
/// ratios. Rounding remainders go to the test split, so every id is always
/// assigned.
#[must_use]
pub fn assign_splits(event_ids: &[String], config: &SplitConfig) -> SplitAssignment {
    let mut ids: Vec<String> = event_ids.to_vec();
    ids.sort();
    ids.dedup();

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    ids.shuffle(&mut rng);

    let n = ids.len();
    let n_train = ((n as f64) * config.train_ratio).round() as usize;
    let n_train = n_train.min(n);
    let n_validation = ((n as f64) * config.validation_ratio).round() as usize;
    let n_validation = n_validation.min(n - n_train);

    let mut train: Vec<String> = ids[..n_train].to_vec();
    let mut validation: Vec<String> = ids[n_train..n_train + n_validation].to_vec();
    let mut test: Vec<String> = ids[n_train + n_validation..].to_vec();
    train.sort();
    validation.sort();
    test.sort();

    let mut by_id = HashMap::with_capacity(n);
    for id in &train {
        by_id.insert(id.clone(), Split::Train);
    }
    for id in &validation {
        by_id.insert(id.clone(), Split::Validation);
    }
    for id in &test {
        by_id.insert(id.clone(), Split::Test);
    }

    SplitAssignment {
        train,
        validation,
        test,
        by_id,
    }
}
