//! Statistical helpers for metric aggregation.

/// Calculates the Wilson score confidence interval for a proportion.
///
/// Preferred over the normal approximation for proportions near 0 or 1 and
/// for small samples.
///
/// # Arguments
/// * `wins` - Number of successes
/// * `n` - Total number of trials
/// * `z` - Z-score for the confidence level (1.96 for 95%)
///
/// # Returns
/// Tuple of (lower_bound, upper_bound), clamped to [0, 1].
#[must_use]
pub fn wilson_ci(wins: usize, n: usize, z: f64) -> (f64, f64) {
    if n == 0 {
        return (0.0, 0.0);
    }

    let n_f = n as f64;
    let p = wins as f64 / n_f;
    let z_sq = z * z;

    let denominator = 1.0 + z_sq / n_f;
    let center = p + z_sq / (2.0 * n_f);
    let spread = z * (p * (1.0 - p) / n_f + z_sq / (4.0 * n_f * n_f)).sqrt();

    let lower = (center - spread) / denominator;
    let upper = (center + spread) / denominator;

    (lower.max(0.0), upper.min(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wilson_ci_zero_trials_is_degenerate() {
        assert_eq!(wilson_ci(0, 0, 1.96), (0.0, 0.0));
    }

    #[test]
    fn wilson_ci_half_at_100_trials() {
        let (lower, upper) = wilson_ci(50, 100, 1.96);
        assert!(lower > 0.39 && lower < 0.41);
        assert!(upper > 0.59 && upper < 0.61);
    }

    #[test]
    fn wilson_ci_is_contained_in_unit_interval() {
        let (lower, upper) = wilson_ci(1, 1, 1.96);
        assert!(lower >= 0.0);
        assert!(upper <= 1.0);
        assert!(lower <= upper);
    }

    #[test]
    fn wilson_ci_narrows_with_sample_size() {
        let (small_lower, small_upper) = wilson_ci(6, 10, 1.96);
        let (large_lower, large_upper) = wilson_ci(600, 1000, 1.96);
        assert!((large_upper - large_lower) < (small_upper - small_lower));
    }
}
