// User-adjustable weight trees and the fixed component schema they are
// validated against.
//
// Callers hand over a loosely-typed `WeightNode` (deserialized from TOML or
// JSON). It is checked once against `SCHEMA` and turned into a `WeightTree`
// whose leaves are typed `LeafMetric`s, so scoring never does string lookups.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::category::CategorySet;
use crate::error::ScoringError;

// ---------------------------------------------------------------------------
// Leaf metrics
// ---------------------------------------------------------------------------

/// A composite leaf tied to one raw number on the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeafMetric {
    TeamWinPct,
    TeamPointsPerGame,
    PlayoffWins,
    PlayoffWinPct,
    AnyPerAttempt,
    TouchdownRate,
    CompletionRate,
    SackRate,
    TurnoverRate,
    PassYardsPerGame,
    PassTouchdownsPerGame,
    RushYardsPerGame,
    ClutchThirdDown,
    ClutchRedZone,
    ClutchLateSeason,
    ClutchPlayoffs,
    Availability,
    Consistency,
    OffensiveLine,
    Weapons,
    Defense,
}

impl LeafMetric {
    /// Raw values where smaller is better get their z-score negated.
    pub fn lower_is_better(self) -> bool {
        matches!(self, LeafMetric::SackRate | LeafMetric::TurnoverRate)
    }

    /// Leaves that only exist when playoffs are included.
    pub fn requires_playoffs(self) -> bool {
        matches!(
            self,
            LeafMetric::PlayoffWins | LeafMetric::PlayoffWinPct | LeafMetric::ClutchPlayoffs
        )
    }

    /// The clutch category this leaf reads, if any.
    pub fn category_key(self) -> Option<&'static str> {
        match self {
            LeafMetric::ClutchThirdDown => Some("third_down"),
            LeafMetric::ClutchRedZone => Some("red_zone"),
            LeafMetric::ClutchLateSeason => Some("late_season"),
            LeafMetric::ClutchPlayoffs => Some("playoffs"),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// One node of the fixed component hierarchy.
#[derive(Debug)]
pub struct SchemaNode {
    pub key: &'static str,
    pub default_weight: f64,
    pub kind: SchemaKind,
}

#[derive(Debug)]
pub enum SchemaKind {
    Leaf(LeafMetric),
    Branch(&'static [SchemaNode]),
}

const fn leaf(key: &'static str, default_weight: f64, metric: LeafMetric) -> SchemaNode {
    SchemaNode {
        key,
        default_weight,
        kind: SchemaKind::Leaf(metric),
    }
}

const fn branch(key: &'static str, default_weight: f64, children: &'static [SchemaNode]) -> SchemaNode {
    SchemaNode {
        key,
        default_weight,
        kind: SchemaKind::Branch(children),
    }
}

static TEAM_PLAYOFFS: [SchemaNode; 2] = [
    leaf("wins", 60.0, LeafMetric::PlayoffWins),
    leaf("win_pct", 40.0, LeafMetric::PlayoffWinPct),
];

static TEAM: [SchemaNode; 3] = [
    leaf("regular_season", 50.0, LeafMetric::TeamWinPct),
    leaf("offense", 30.0, LeafMetric::TeamPointsPerGame),
    branch("playoffs", 20.0, &TEAM_PLAYOFFS),
];

static EFFICIENCY: [SchemaNode; 3] = [
    leaf("any_a", 50.0, LeafMetric::AnyPerAttempt),
    leaf("td_rate", 25.0, LeafMetric::TouchdownRate),
    leaf("completion_rate", 25.0, LeafMetric::CompletionRate),
];

static PROTECTION: [SchemaNode; 2] = [
    leaf("sack_rate", 50.0, LeafMetric::SackRate),
    leaf("turnover_rate", 50.0, LeafMetric::TurnoverRate),
];

static VOLUME: [SchemaNode; 3] = [
    leaf("pass_yards", 50.0, LeafMetric::PassYardsPerGame),
    leaf("pass_tds", 30.0, LeafMetric::PassTouchdownsPerGame),
    leaf("rush_yards", 20.0, LeafMetric::RushYardsPerGame),
];

static STATS: [SchemaNode; 3] = [
    branch("efficiency", 50.0, &EFFICIENCY),
    branch("protection", 25.0, &PROTECTION),
    branch("volume", 25.0, &VOLUME),
];

static CLUTCH: [SchemaNode; 4] = [
    leaf("third_down", 30.0, LeafMetric::ClutchThirdDown),
    leaf("red_zone", 30.0, LeafMetric::ClutchRedZone),
    leaf("late_season", 20.0, LeafMetric::ClutchLateSeason),
    leaf("playoffs", 20.0, LeafMetric::ClutchPlayoffs),
];

static DURABILITY: [SchemaNode; 2] = [
    leaf("availability", 60.0, LeafMetric::Availability),
    leaf("consistency", 40.0, LeafMetric::Consistency),
];

static SUPPORT: [SchemaNode; 3] = [
    leaf("offensive_line", 40.0, LeafMetric::OffensiveLine),
    leaf("weapons", 35.0, LeafMetric::Weapons),
    leaf("defense", 25.0, LeafMetric::Defense),
];

/// The five top-level components and their default weights.
pub static SCHEMA: [SchemaNode; 5] = [
    branch("team", 25.0, &TEAM),
    branch("stats", 35.0, &STATS),
    branch("clutch", 20.0, &CLUTCH),
    branch("durability", 10.0, &DURABILITY),
    branch("support", 10.0, &SUPPORT),
];

// ---------------------------------------------------------------------------
// Untyped input
// ---------------------------------------------------------------------------

/// A weight tree as supplied by the caller: numbers at leaves, tables at
/// interior nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WeightNode {
    Leaf(f64),
    Branch(BTreeMap<String, WeightNode>),
}

impl WeightNode {
    pub fn from_json(text: &str) -> Result<WeightNode, ScoringError> {
        serde_json::from_str(text).map_err(|e| ScoringError::Parse {
            message: e.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Validated tree
// ---------------------------------------------------------------------------

/// A validated component with its resolved weight.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedComponent {
    pub key: &'static str,
    pub weight: f64,
    pub body: ComponentBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComponentBody {
    Leaf(LeafMetric),
    Branch(Vec<WeightedComponent>),
}

/// The five top-level components with every weight resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTree {
    pub components: Vec<WeightedComponent>,
}

impl Default for WeightTree {
    /// Schema default weights throughout.
    fn default() -> Self {
        WeightTree {
            components: SCHEMA.iter().map(|n| default_component(n, n.default_weight)).collect(),
        }
    }
}

impl WeightTree {
    /// Validate a caller-supplied tree against the schema.
    ///
    /// Keys the caller leaves out weigh 0. A number where the schema has a
    /// branch sets the branch weight and keeps default child weights.
    pub fn from_node(node: &WeightNode) -> Result<WeightTree, ScoringError> {
        let WeightNode::Branch(children) = node else {
            return Err(ScoringError::ShapeMismatch {
                path: "<root>".into(),
                expected: "a table of components",
            });
        };
        Ok(WeightTree {
            components: resolve_children(&SCHEMA, children, "")?,
        })
    }

    pub fn from_json(text: &str) -> Result<WeightTree, ScoringError> {
        WeightTree::from_node(&WeightNode::from_json(text)?)
    }

    pub fn component(&self, key: &str) -> Option<&WeightedComponent> {
        self.components.iter().find(|c| c.key == key)
    }

    /// Every leaf metric in the tree, regardless of weight.
    pub fn leaf_metrics(&self) -> Vec<LeafMetric> {
        let mut out = Vec::new();
        for c in &self.components {
            collect_leaves(c, &mut out);
        }
        out
    }

    /// Fail if a clutch leaf names a category the set does not define.
    pub fn check_categories(&self, categories: &CategorySet) -> Result<(), ScoringError> {
        for metric in self.leaf_metrics() {
            if let Some(key) = metric.category_key() {
                if categories.get(key).is_none() {
                    return Err(ScoringError::MissingCategory { key: key.to_string() });
                }
            }
        }
        Ok(())
    }

    /// Back to the untyped form, e.g. for echoing effective weights.
    pub fn to_node(&self) -> WeightNode {
        WeightNode::Branch(self.components.iter().map(|c| (c.key.to_string(), component_to_node(c))).collect())
    }
}

fn component_to_node(component: &WeightedComponent) -> WeightNode {
    match &component.body {
        ComponentBody::Leaf(_) => WeightNode::Leaf(component.weight),
        ComponentBody::Branch(children) => {
            let mut table: BTreeMap<String, WeightNode> = children
                .iter()
                .map(|c| (c.key.to_string(), component_to_node(c)))
                .collect();
            table.insert("weight".to_string(), WeightNode::Leaf(component.weight));
            WeightNode::Branch(table)
        }
    }
}

fn collect_leaves(component: &WeightedComponent, out: &mut Vec<LeafMetric>) {
    match &component.body {
        ComponentBody::Leaf(metric) => out.push(*metric),
        ComponentBody::Branch(children) => {
            for child in children {
                collect_leaves(child, out);
            }
        }
    }
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn check_weight(path: &str, value: f64) -> Result<f64, ScoringError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ScoringError::InvalidWeight {
            path: path.to_string(),
            value,
        });
    }
    Ok(value)
}

fn default_component(schema: &SchemaNode, weight: f64) -> WeightedComponent {
    let body = match &schema.kind {
        SchemaKind::Leaf(metric) => ComponentBody::Leaf(*metric),
        SchemaKind::Branch(children) => ComponentBody::Branch(
            children
                .iter()
                .map(|c| default_component(c, c.default_weight))
                .collect(),
        ),
    };
    WeightedComponent {
        key: schema.key,
        weight,
        body,
    }
}

fn resolve_children(
    schema: &'static [SchemaNode],
    given: &BTreeMap<String, WeightNode>,
    parent: &str,
) -> Result<Vec<WeightedComponent>, ScoringError> {
    if let Some(unknown) = given.keys().find(|k| !schema.iter().any(|s| s.key == k.as_str())) {
        return Err(ScoringError::UnknownComponent {
            path: join_path(parent, unknown),
        });
    }

    schema
        .iter()
        .map(|s| {
            let path = join_path(parent, s.key);
            match given.get(s.key) {
                None => Ok(default_component(s, 0.0)),
                Some(node) => resolve_node(s, node, &path),
            }
        })
        .collect()
}

fn resolve_node(schema: &SchemaNode, node: &WeightNode, path: &str) -> Result<WeightedComponent, ScoringError> {
    match (&schema.kind, node) {
        (_, WeightNode::Leaf(value)) => Ok(default_component(schema, check_weight(path, *value)?)),
        (SchemaKind::Leaf(_), WeightNode::Branch(_)) => Err(ScoringError::ShapeMismatch {
            path: path.to_string(),
            expected: "a number",
        }),
        (SchemaKind::Branch(children), WeightNode::Branch(given)) => {
            // A table may carry its own weight under `weight`; otherwise the
            // branch keeps its schema default relative to its siblings.
            let mut given = given.clone();
            let weight = match given.remove("weight") {
                Some(WeightNode::Leaf(w)) => check_weight(&join_path(path, "weight"), w)?,
                Some(WeightNode::Branch(_)) => {
                    return Err(ScoringError::ShapeMismatch {
                        path: join_path(path, "weight"),
                        expected: "a number",
                    })
                }
                None => schema.default_weight,
            };
            Ok(WeightedComponent {
                key: schema.key,
                weight,
                body: ComponentBody::Branch(resolve_children(children, &given, path)?),
            })
        }
    }
}

/// Weighted average over the parts that have a score and a positive weight.
///
/// Returns `None` when no weight applies, so an empty or zero-weighted
/// branch drops out of its parent instead of pulling it toward zero.
pub fn combine_weighted<I>(parts: I) -> Option<f64>
where
    I: IntoIterator<Item = (Option<f64>, f64)>,
{
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for (score, weight) in parts {
        let Some(score) = score else { continue };
        if !(weight > 0.0) {
            continue;
        }
        weighted_sum += score * weight;
        weight_total += weight;
    }
    if weight_total > 0.0 {
        Some(weighted_sum / weight_total)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn renormalizes_by_actual_weight_sum() {
        // {a: 30, b: 30} with scores {1.0, 0.0} -> 0.5, not 0.3
        let score = combine_weighted([(Some(1.0), 30.0), (Some(0.0), 30.0)]).unwrap();
        assert!(approx_eq(score, 0.5, 1e-12));
    }

    #[test]
    fn absent_parts_leave_the_denominator() {
        let score = combine_weighted([(Some(0.8), 50.0), (None, 50.0)]).unwrap();
        assert!(approx_eq(score, 0.8, 1e-12));
    }

    #[test]
    fn all_zero_weights_give_none() {
        assert_eq!(combine_weighted([(Some(1.0), 0.0), (Some(0.5), 0.0)]), None);
        assert_eq!(combine_weighted(Vec::<(Option<f64>, f64)>::new()), None);
    }

    #[test]
    fn default_tree_follows_schema() {
        let tree = WeightTree::default();
        let keys: Vec<&str> = tree.components.iter().map(|c| c.key).collect();
        assert_eq!(keys, vec!["team", "stats", "clutch", "durability", "support"]);
        let total: f64 = tree.components.iter().map(|c| c.weight).sum();
        assert!(approx_eq(total, 100.0, 1e-12));
        assert_eq!(tree.leaf_metrics().len(), 21);
    }

    #[test]
    fn parses_nested_json_tree() {
        let json = r#"{
            "team": 20,
            "stats": {"weight": 50, "efficiency": {"any_a": 100}, "volume": 0},
            "clutch": 30
        }"#;
        let tree = WeightTree::from_json(json).unwrap();
        assert!(approx_eq(tree.component("team").unwrap().weight, 20.0, 1e-12));
        assert!(approx_eq(tree.component("durability").unwrap().weight, 0.0, 1e-12));

        let stats = tree.component("stats").unwrap();
        assert!(approx_eq(stats.weight, 50.0, 1e-12));
        let ComponentBody::Branch(children) = &stats.body else {
            panic!("stats should be a branch");
        };
        let efficiency = children.iter().find(|c| c.key == "efficiency").unwrap();
        let ComponentBody::Branch(eff_children) = &efficiency.body else {
            panic!("efficiency should be a branch");
        };
        let td = eff_children.iter().find(|c| c.key == "td_rate").unwrap();
        assert_eq!(td.weight, 0.0);
        let protection = children.iter().find(|c| c.key == "protection").unwrap();
        assert_eq!(protection.weight, 0.0);
    }

    #[test]
    fn numeric_branch_keeps_default_children() {
        let tree = WeightTree::from_json(r#"{"clutch": 40}"#).unwrap();
        let clutch = tree.component("clutch").unwrap();
        let ComponentBody::Branch(children) = &clutch.body else {
            panic!("clutch should be a branch");
        };
        let third = children.iter().find(|c| c.key == "third_down").unwrap();
        assert!(approx_eq(third.weight, 30.0, 1e-12));
    }

    #[test]
    fn unknown_component_is_reported_with_path() {
        let err = WeightTree::from_json(r#"{"stats": {"efficiency": {"qbr": 10}}}"#).unwrap_err();
        assert_eq!(
            err,
            ScoringError::UnknownComponent {
                path: "stats.efficiency.qbr".into()
            }
        );
    }

    #[test]
    fn table_at_leaf_is_a_shape_error() {
        let err = WeightTree::from_json(r#"{"durability": {"availability": {"x": 1}}}"#).unwrap_err();
        assert!(matches!(err, ScoringError::ShapeMismatch { ref path, .. } if path == "durability.availability"));
    }

    #[test]
    fn negative_weight_is_rejected() {
        let err = WeightTree::from_json(r#"{"support": -5}"#).unwrap_err();
        assert!(matches!(err, ScoringError::InvalidWeight { .. }));
    }

    #[test]
    fn root_must_be_a_table() {
        assert!(matches!(
            WeightTree::from_json("12").unwrap_err(),
            ScoringError::ShapeMismatch { .. }
        ));
    }

    #[test]
    fn missing_clutch_category_is_reported() {
        let tree = WeightTree::default();
        assert!(tree.check_categories(&CategorySet::default()).is_ok());

        let mut categories = CategorySet::default();
        categories.categories.retain(|c| c.key != "red_zone");
        assert_eq!(
            tree.check_categories(&categories).unwrap_err(),
            ScoringError::MissingCategory { key: "red_zone".into() }
        );
    }

    #[test]
    fn to_node_round_trips_effective_weights() {
        let tree = WeightTree::from_json(r#"{"team": 10, "stats": {"volume": 5}}"#).unwrap();
        let again = WeightTree::from_node(&tree.to_node()).unwrap();
        assert_eq!(tree, again);
    }
}
