// Population-relative comparison: pool means, standard deviations, z-scores.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::category::{normalize, Category};
use crate::metrics::{compute_metric, MetricKind};
use crate::profile::PlayerId;
use crate::stats::AggregatedStats;

/// Minimum attempts for a player to count toward a category's league average.
pub const DEFAULT_MIN_ATTEMPTS: f64 = 10.0;

/// Threshold below which standard deviation is treated as zero.
const STDEV_EPSILON: f64 = 1e-9;

/// Z-scores beyond +/- this many deviations saturate the unit mapping.
pub const Z_SPAN: f64 = 3.0;

// ---------------------------------------------------------------------------
// Pool statistics
// ---------------------------------------------------------------------------

/// Mean and standard deviation of one value across a player pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PoolStats {
    pub mean: f64,
    pub stdev: f64,
    pub count: usize,
}

/// Compute mean and standard deviation for a slice of values.
///
/// Returns zeros for an empty slice. Uses the population standard deviation
/// (N denominator), since the pool is every eligible player, not a sample.
pub fn compute_pool_stats(values: &[f64]) -> PoolStats {
    if values.is_empty() {
        return PoolStats::default();
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    PoolStats {
        mean,
        stdev: variance.sqrt(),
        count: values.len(),
    }
}

/// Compute a z-score given a value and pool stats.
///
/// Returns 0.0 if the standard deviation is approximately zero.
pub fn compute_zscore(value: f64, stats: &PoolStats) -> f64 {
    if stats.stdev < STDEV_EPSILON {
        return 0.0;
    }
    (value - stats.mean) / stats.stdev
}

/// Map a z-score onto [0, 1]: -Z_SPAN -> 0, league average -> 0.5, +Z_SPAN -> 1.
pub fn z_to_unit(z: f64) -> f64 {
    ((z + Z_SPAN) / (2.0 * Z_SPAN)).clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Category league averages
// ---------------------------------------------------------------------------

/// League context for one category across a season's roster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulationSummary {
    pub category_key: String,
    pub qualified_players: usize,
    pub metrics: BTreeMap<MetricKind, PoolStats>,
    pub normalized_score: PoolStats,
}

impl PopulationSummary {
    pub fn mean(&self, kind: MetricKind) -> Option<f64> {
        self.metrics.get(&kind).map(|s| s.mean)
    }

    /// How many deviations `value` sits from the league mean for `kind`.
    /// Zero when the metric has no league baseline.
    pub fn deviation(&self, kind: MetricKind, value: f64) -> f64 {
        self.metrics
            .get(&kind)
            .map(|s| compute_zscore(value, s))
            .unwrap_or(0.0)
    }
}

/// Summarize a category across every player's stats for that category.
///
/// Players below `min_attempts` are left out entirely so low-sample and
/// zero-sample players do not drag the averages toward zero. The map is
/// ordered so repeated calls sum in the same order.
pub fn compare_across_population(
    per_player: &BTreeMap<PlayerId, AggregatedStats>,
    category: &Category,
    min_attempts: f64,
) -> PopulationSummary {
    let qualified: Vec<&AggregatedStats> = per_player
        .values()
        .filter(|s| s.has_data() && s.total_attempts() >= min_attempts)
        .collect();

    let mut metrics = BTreeMap::new();
    for metric in &category.metrics {
        let values: Vec<f64> = qualified
            .iter()
            .filter(|s| metric.kind.is_present(s))
            .map(|s| compute_metric(metric.kind, s))
            .collect();
        if !values.is_empty() {
            metrics.insert(metric.kind, compute_pool_stats(&values));
        }
    }

    let scores: Vec<f64> = qualified
        .iter()
        .map(|s| normalize(s, category).normalized_score)
        .collect();

    PopulationSummary {
        category_key: category.key.clone(),
        qualified_players: qualified.len(),
        metrics,
        normalized_score: compute_pool_stats(&scores),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
