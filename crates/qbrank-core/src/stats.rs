// Aggregation of situational stat records into summed totals with derived rates.

use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

use crate::metrics::{compute_metric, MetricKind};

// ---------------------------------------------------------------------------
// Raw counts
// ---------------------------------------------------------------------------

/// Raw passing/rushing/turnover counts for any slice of play.
///
/// Counts are `f64` because upstream sources occasionally carry fractional
/// or blank cells; the ingestion layer coerces those before they get here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatTotals {
    pub attempts: f64,
    pub completions: f64,
    pub yards: f64,
    pub touchdowns: f64,
    pub interceptions: f64,
    pub sacks: f64,
    pub sack_yards: f64,
    pub first_downs: f64,
    pub fumbles: f64,
    pub fumbles_lost: f64,
    pub rush_attempts: f64,
    pub rush_yards: f64,
    pub rush_touchdowns: f64,
}

/// Non-finite values count as zero.
fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

impl StatTotals {
    /// Copy with every non-finite field replaced by zero.
    pub fn sanitized(&self) -> Self {
        StatTotals {
            attempts: finite_or_zero(self.attempts),
            completions: finite_or_zero(self.completions),
            yards: finite_or_zero(self.yards),
            touchdowns: finite_or_zero(self.touchdowns),
            interceptions: finite_or_zero(self.interceptions),
            sacks: finite_or_zero(self.sacks),
            sack_yards: finite_or_zero(self.sack_yards),
            first_downs: finite_or_zero(self.first_downs),
            fumbles: finite_or_zero(self.fumbles),
            fumbles_lost: finite_or_zero(self.fumbles_lost),
            rush_attempts: finite_or_zero(self.rush_attempts),
            rush_yards: finite_or_zero(self.rush_yards),
            rush_touchdowns: finite_or_zero(self.rush_touchdowns),
        }
    }

    /// Pass attempts plus sacks.
    pub fn dropbacks(&self) -> f64 {
        self.attempts + self.sacks
    }

    /// Pass attempts plus designed rushes.
    pub fn plays(&self) -> f64 {
        self.attempts + self.rush_attempts
    }
}

impl AddAssign<&StatTotals> for StatTotals {
    fn add_assign(&mut self, rhs: &StatTotals) {
        let rhs = rhs.sanitized();
        self.attempts += rhs.attempts;
        self.completions += rhs.completions;
        self.yards += rhs.yards;
        self.touchdowns += rhs.touchdowns;
        self.interceptions += rhs.interceptions;
        self.sacks += rhs.sacks;
        self.sack_yards += rhs.sack_yards;
        self.first_downs += rhs.first_downs;
        self.fumbles += rhs.fumbles;
        self.fumbles_lost += rhs.fumbles_lost;
        self.rush_attempts += rhs.rush_attempts;
        self.rush_yards += rhs.rush_yards;
        self.rush_touchdowns += rhs.rush_touchdowns;
    }
}

// ---------------------------------------------------------------------------
// Situational records
// ---------------------------------------------------------------------------

/// One player's stats for one season under one (split type, split value)
/// pair, e.g. `("Down & Yards to Go", "3rd & 1-3")`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SituationalRecord {
    pub split_type: String,
    pub split_value: String,
    #[serde(flatten)]
    pub totals: StatTotals,
}

impl SituationalRecord {
    pub fn new(split_type: impl Into<String>, split_value: impl Into<String>, totals: StatTotals) -> Self {
        SituationalRecord {
            split_type: split_type.into(),
            split_value: split_value.into(),
            totals,
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregated stats
// ---------------------------------------------------------------------------

/// Summed totals plus every derived rate. Rates are zero whenever their
/// denominator is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AggregatedStats {
    pub totals: StatTotals,
    pub completion_rate: f64,
    pub touchdown_rate: f64,
    pub interception_rate: f64,
    pub sack_rate: f64,
    pub turnover_rate: f64,
    pub conversion_rate: f64,
    pub yards_per_attempt: f64,
    pub any_per_attempt: f64,
    pub rush_yards_per_attempt: f64,
    pub rush_touchdown_rate: f64,
}

impl AggregatedStats {
    /// Build from raw totals, deriving every rate field.
    pub fn from_totals(totals: StatTotals) -> Self {
        let totals = totals.sanitized();
        let mut stats = AggregatedStats {
            totals,
            ..AggregatedStats::default()
        };
        stats.completion_rate = compute_metric(MetricKind::CompletionRate, &stats);
        stats.touchdown_rate = compute_metric(MetricKind::TouchdownRate, &stats);
        stats.interception_rate = compute_metric(MetricKind::InterceptionRate, &stats);
        stats.sack_rate = compute_metric(MetricKind::SackRate, &stats);
        stats.turnover_rate = compute_metric(MetricKind::TurnoverRate, &stats);
        stats.conversion_rate = compute_metric(MetricKind::ConversionRate, &stats);
        stats.yards_per_attempt = compute_metric(MetricKind::YardsPerAttempt, &stats);
        stats.any_per_attempt = compute_metric(MetricKind::AnyPerAttempt, &stats);
        stats.rush_yards_per_attempt = compute_metric(MetricKind::RushYardsPerAttempt, &stats);
        stats.rush_touchdown_rate = compute_metric(MetricKind::RushTouchdownRate, &stats);
        stats
    }

    pub fn total_attempts(&self) -> f64 {
        self.totals.attempts
    }

    pub fn has_data(&self) -> bool {
        self.totals.attempts > 0.0
    }
}

/// Sum any number of situational records into one `AggregatedStats`.
///
/// An empty slice yields all zeros.
pub fn aggregate<'a, I>(records: I) -> AggregatedStats
where
    I: IntoIterator<Item = &'a SituationalRecord>,
{
    let mut totals = StatTotals::default();
    for record in records {
        totals += &record.totals;
    }
    AggregatedStats::from_totals(totals)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
