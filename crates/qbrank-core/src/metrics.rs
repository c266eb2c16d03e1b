// Derived rate and efficiency metrics.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::stats::{AggregatedStats, StatTotals};

/// Yardage credit per passing touchdown in ANY/A.
pub const ANY_A_TD_BONUS: f64 = 20.0;
/// Yardage penalty per interception in ANY/A.
pub const ANY_A_INT_PENALTY: f64 = 45.0;

/// Every metric the engine knows how to derive from aggregated stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    CompletionRate,
    TouchdownRate,
    InterceptionRate,
    SackRate,
    TurnoverRate,
    ConversionRate,
    YardsPerAttempt,
    AnyPerAttempt,
    RushYardsPerAttempt,
    RushTouchdownRate,
}

impl MetricKind {
    pub const ALL: [MetricKind; 10] = [
        MetricKind::CompletionRate,
        MetricKind::TouchdownRate,
        MetricKind::InterceptionRate,
        MetricKind::SackRate,
        MetricKind::TurnoverRate,
        MetricKind::ConversionRate,
        MetricKind::YardsPerAttempt,
        MetricKind::AnyPerAttempt,
        MetricKind::RushYardsPerAttempt,
        MetricKind::RushTouchdownRate,
    ];

    /// Stable snake_case key, matching the serde representation.
    pub fn key(self) -> &'static str {
        match self {
            MetricKind::CompletionRate => "completion_rate",
            MetricKind::TouchdownRate => "touchdown_rate",
            MetricKind::InterceptionRate => "interception_rate",
            MetricKind::SackRate => "sack_rate",
            MetricKind::TurnoverRate => "turnover_rate",
            MetricKind::ConversionRate => "conversion_rate",
            MetricKind::YardsPerAttempt => "yards_per_attempt",
            MetricKind::AnyPerAttempt => "any_per_attempt",
            MetricKind::RushYardsPerAttempt => "rush_yards_per_attempt",
            MetricKind::RushTouchdownRate => "rush_touchdown_rate",
        }
    }

    pub fn from_key(key: &str) -> Option<MetricKind> {
        MetricKind::ALL.into_iter().find(|k| k.key() == key)
    }

    /// The count this metric divides by.
    pub fn denominator(self, totals: &StatTotals) -> f64 {
        match self {
            MetricKind::CompletionRate
            | MetricKind::TouchdownRate
            | MetricKind::InterceptionRate
            | MetricKind::TurnoverRate
            | MetricKind::YardsPerAttempt => totals.attempts,
            MetricKind::SackRate | MetricKind::AnyPerAttempt => totals.dropbacks(),
            MetricKind::ConversionRate => totals.plays(),
            MetricKind::RushYardsPerAttempt | MetricKind::RushTouchdownRate => totals.rush_attempts,
        }
    }

    fn numerator(self, totals: &StatTotals) -> f64 {
        match self {
            MetricKind::CompletionRate => totals.completions,
            MetricKind::TouchdownRate => totals.touchdowns,
            MetricKind::InterceptionRate => totals.interceptions,
            MetricKind::SackRate => totals.sacks,
            MetricKind::TurnoverRate => totals.interceptions + totals.fumbles_lost,
            MetricKind::ConversionRate => totals.first_downs,
            MetricKind::YardsPerAttempt => totals.yards,
            MetricKind::AnyPerAttempt => {
                totals.yards + ANY_A_TD_BONUS * totals.touchdowns
                    - ANY_A_INT_PENALTY * totals.interceptions
                    - totals.sack_yards
            }
            MetricKind::RushYardsPerAttempt => totals.rush_yards,
            MetricKind::RushTouchdownRate => totals.rush_touchdowns,
        }
    }

    /// True when the stats carry a nonzero denominator for this metric.
    pub fn is_present(self, stats: &AggregatedStats) -> bool {
        self.denominator(&stats.totals) > 0.0
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Compute one metric. Returns exactly 0.0 when the denominator is zero;
/// the numerator is never clamped, so ratios above 1 pass through.
pub fn compute_metric(kind: MetricKind, stats: &AggregatedStats) -> f64 {
    ratio(kind.numerator(&stats.totals), kind.denominator(&stats.totals))
}

/// `(yards + 20*TD - 45*INT - sack_yards) / (attempts + sacks)`
pub fn any_per_attempt(totals: &StatTotals) -> f64 {
    ratio(
        MetricKind::AnyPerAttempt.numerator(totals),
        MetricKind::AnyPerAttempt.denominator(totals),
    )
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
