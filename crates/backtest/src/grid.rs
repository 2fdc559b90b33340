//! Threshold grid enumeration.

use oddsgap_core::GridConfig;
use serde::{Deserialize, Serialize};

/// Two thresholds that are treated as equal when enumerating the grid.
///
/// Guards against float stepping errors making `exit == entry` pairs leak
/// through the strict `exit < entry` filter.
const THRESHOLD_EQ_EPSILON: f64 = 1e-9;

/// One `(entry, exit)` threshold pair.
///
/// Invariant: `entry_threshold > 0`, `exit_threshold >= 0`, and
/// `exit_threshold < entry_threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridCombination {
    pub entry_threshold: f64,
    pub exit_threshold: f64,
}

/// Enumerates every valid combination for the configured ranges.
///
/// The cross product of both ranges, filtered to `exit < entry`; pairs
/// where the thresholds coincide (within float tolerance) never appear.
#[must_use]
pub fn generate_grid(config: &GridConfig) -> Vec<GridCombination> {
    let entries: Vec<f64> = enumerate_range(config.entry_min, config.entry_max, config.entry_step)
        .into_iter()
        .filter(|&e| e > 0.0)
        .collect();
    let exits: Vec<f64> = enumerate_range(config.exit_min, config.exit_max, config.exit_step)
        .into_iter()
        .filter(|&x| x >= 0.0)
        .collect();

    let mut combinations = Vec::with_capacity(entries.len() * exits.len());
    for &entry in &entries {
        for &exit in &exits {
            if entry - exit > THRESHOLD_EQ_EPSILON {
                combinations.push(GridCombination {
                    entry_threshold: entry,
                    exit_threshold: exit,
                });
            }
        }
    }
    combinations
}

/// Inclusive range walk that recomputes each value from the index, so long
/// ranges do not accumulate additive float drift.
fn enumerate_range(min: f64, max: f64, step: f64) -> Vec<f64> {
    let mut values = Vec::new();
    if step <= 0.0 {
        return values;
    }
    let mut k: u32 = 0;
    loop {
        let value = min + f64::from(k) * step;
        if value > max + step * 1e-6 {
            break;
        }
        values.push(value);
        k += 1;
    }
    values
}
