// Situational ("clutch") categories and their normalization to [0, 1].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::metrics::{compute_metric, MetricKind};
use crate::stats::{aggregate, AggregatedStats, SituationalRecord};

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// Selects records whose split type matches and whose value is one of `values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitSelector {
    pub split_type: String,
    pub values: Vec<String>,
}

impl SplitSelector {
    pub fn new(split_type: &str, values: &[&str]) -> Self {
        SplitSelector {
            split_type: split_type.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn matches(&self, record: &SituationalRecord) -> bool {
        same_label(&self.split_type, &record.split_type)
            && self.values.iter().any(|v| same_label(v, &record.split_value))
    }
}

fn same_label(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// One metric a category scores, with its relative weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryMetric {
    pub kind: MetricKind,
    pub weight: f64,
    /// Lower raw values are better (sack rate, turnover rate).
    #[serde(default)]
    pub inverted: bool,
}

impl CategoryMetric {
    pub fn new(kind: MetricKind, weight: f64) -> Self {
        CategoryMetric {
            kind,
            weight,
            inverted: false,
        }
    }

    pub fn inverted(kind: MetricKind, weight: f64) -> Self {
        CategoryMetric {
            kind,
            weight,
            inverted: true,
        }
    }
}

/// Where a category draws its stats from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryScope {
    /// Situational split records matched by the selectors.
    #[default]
    Splits,
    /// The profile's postseason totals; selectors are ignored.
    PlayoffTotals,
}

/// A named analytical slice, e.g. "Third Down Success".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub scope: CategoryScope,
    #[serde(default)]
    pub selectors: Vec<SplitSelector>,
    pub metrics: Vec<CategoryMetric>,
}

impl Category {
    /// True when any selector accepts the record.
    pub fn matches(&self, record: &SituationalRecord) -> bool {
        self.selectors.iter().any(|s| s.matches(record))
    }

    /// Aggregate the subset of `records` this category draws from.
    pub fn aggregate_splits(&self, records: &[SituationalRecord]) -> AggregatedStats {
        aggregate(records.iter().filter(|r| self.matches(r)))
    }
}

// ---------------------------------------------------------------------------
// Performance
// ---------------------------------------------------------------------------

/// One player's result in one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryPerformance {
    pub category_key: String,
    /// Raw values of the category's metrics that had a nonzero denominator.
    pub metrics: BTreeMap<MetricKind, f64>,
    pub normalized_score: f64,
    pub total_attempts: f64,
    pub has_data: bool,
}

/// Collapse `stats` into one [0, 1] score for `category`.
///
/// Inverted metrics become `1 - min(value, 1)`. Metrics whose denominator is
/// zero are skipped rather than counted as zero, and the weighted average
/// divides by the weight actually applied.
pub fn normalize(stats: &AggregatedStats, category: &Category) -> CategoryPerformance {
    let mut metrics = BTreeMap::new();
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;

    for metric in &category.metrics {
        if !metric.kind.is_present(stats) {
            continue;
        }
        let value = compute_metric(metric.kind, stats);
        metrics.insert(metric.kind, value);

        if !(metric.weight > 0.0) {
            continue;
        }
        // Only inverted metrics are capped before use.
        let oriented = if metric.inverted {
            1.0 - value.min(1.0)
        } else {
            value
        };
        weighted_sum += oriented * metric.weight;
        weight_total += metric.weight;
    }

    let normalized_score = if weight_total > 0.0 {
        (weighted_sum / weight_total).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let total_attempts = stats.total_attempts();
    CategoryPerformance {
        category_key: category.key.clone(),
        metrics,
        normalized_score,
        total_attempts,
        has_data: total_attempts > 0.0,
    }
}

// ---------------------------------------------------------------------------
// Category sets
// ---------------------------------------------------------------------------

/// The categories in effect for a scoring pass, looked up by key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySet {
    pub categories: Vec<Category>,
}

impl CategorySet {
    pub fn get(&self, key: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }
}

impl Default for CategorySet {
    fn default() -> Self {
        default_clutch_categories()
    }
}

/// The four built-in clutch categories.
pub fn default_clutch_categories() -> CategorySet {
    use MetricKind::*;

    CategorySet {
        categories: vec![
            Category {
                key: "third_down".into(),
                name: "Third Down Success".into(),
                scope: CategoryScope::Splits,
                selectors: vec![SplitSelector::new(
                    "Down & Yards to Go",
                    &["3rd & 1-3", "3rd & 4-6", "3rd & 7-9", "3rd & 10+"],
                )],
                metrics: vec![
                    CategoryMetric::new(ConversionRate, 0.5),
                    CategoryMetric::new(CompletionRate, 0.2),
                    CategoryMetric::inverted(SackRate, 0.15),
                    CategoryMetric::inverted(TurnoverRate, 0.15),
                ],
            },
            Category {
                key: "red_zone".into(),
                name: "Red Zone Efficiency".into(),
                scope: CategoryScope::Splits,
                // "Inside 10" is a subset of "Red Zone" in split feeds.
                selectors: vec![SplitSelector::new("Field Position", &["Red Zone"])],
                metrics: vec![
                    CategoryMetric::new(TouchdownRate, 0.5),
                    CategoryMetric::new(CompletionRate, 0.25),
                    CategoryMetric::inverted(TurnoverRate, 0.25),
                ],
            },
            Category {
                key: "late_season".into(),
                name: "Late Season".into(),
                scope: CategoryScope::Splits,
                selectors: vec![SplitSelector::new("Month", &["December", "January"])],
                metrics: vec![
                    CategoryMetric::new(CompletionRate, 0.3),
                    CategoryMetric::new(TouchdownRate, 0.3),
                    CategoryMetric::new(ConversionRate, 0.2),
                    CategoryMetric::inverted(TurnoverRate, 0.2),
                ],
            },
            Category {
                key: "playoffs".into(),
                name: "Playoff Performance".into(),
                scope: CategoryScope::PlayoffTotals,
                selectors: Vec::new(),
                metrics: vec![
                    CategoryMetric::new(CompletionRate, 0.3),
                    CategoryMetric::new(TouchdownRate, 0.3),
                    CategoryMetric::inverted(TurnoverRate, 0.25),
                    CategoryMetric::inverted(SackRate, 0.15),
                ],
            },
        ],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
