// Hierarchical weight composer: walks a validated weight tree and folds every
// leaf's population-relative score into one 0-100 composite.
//
// Scoring a roster happens in two phases:
// 1. `RosterContext::build` filters the roster to eligible players and
//    computes, per leaf metric, the pool mean and standard deviation. This is
//    the only roster-wide step.
// 2. Each profile is scored independently against those baselines, so
//    `compose_all` fans out across players with rayon.

use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::category::{CategoryPerformance, CategorySet};
use crate::eligibility::{filter_eligible, is_eligible, EligibilityThresholds, ScoringMode, SeasonStatus};
use crate::error::ScoringError;
use crate::metrics::{compute_metric, MetricKind};
use crate::population::{
    compare_across_population, compute_pool_stats, compute_zscore, z_to_unit, PoolStats, PopulationSummary,
    DEFAULT_MIN_ATTEMPTS,
};
use crate::profile::{PlayerId, PlayerSeasonProfile, SeasonLine};
use crate::weights::{combine_weighted, ComponentBody, LeafMetric, WeightTree, WeightedComponent};

/// Composite scores run from 0 to this value.
pub const SCORE_SCALE: f64 = 100.0;

/// Seasons (ending at the scored one) that count toward single-season consistency.
const CONSISTENCY_WINDOW: u16 = 3;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Per-pass settings that are not weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoringOptions {
    pub mode: ScoringMode,
    pub include_playoffs: bool,
    pub thresholds: EligibilityThresholds,
    /// Minimum category attempts to count toward a clutch league baseline.
    pub min_category_attempts: f64,
}

impl ScoringOptions {
    pub fn new(mode: ScoringMode) -> Self {
        ScoringOptions {
            mode,
            include_playoffs: true,
            thresholds: EligibilityThresholds::default(),
            min_category_attempts: DEFAULT_MIN_ATTEMPTS,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// One node of a player's score tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentScore {
    pub key: &'static str,
    /// Weight as configured.
    pub weight: f64,
    /// Share of the parent this node actually carried; 0 when it dropped out.
    pub effective_weight: f64,
    /// 0-100, or `None` when the player has no data for this node.
    pub score: Option<f64>,
    /// The raw input behind a leaf score.
    pub raw: Option<f64>,
    pub children: Vec<ComponentScore>,
}

impl ComponentScore {
    pub fn child(&self, key: &str) -> Option<&ComponentScore> {
        self.children.iter().find(|c| c.key == key)
    }
}

/// A player's composite score plus the full component tree behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub player_id: PlayerId,
    pub name: String,
    pub team: String,
    pub season: u16,
    pub eligible: bool,
    pub overall: f64,
    pub components: Vec<ComponentScore>,
}

impl ScoreBreakdown {
    pub fn component(&self, key: &str) -> Option<&ComponentScore> {
        self.components.iter().find(|c| c.key == key)
    }

    /// Follow a dotted path such as `stats.efficiency.any_a`.
    pub fn at(&self, path: &str) -> Option<&ComponentScore> {
        let mut parts = path.split('.');
        let mut node = self.component(parts.next()?)?;
        for part in parts {
            node = node.child(part)?;
        }
        Some(node)
    }
}

/// A clutch category result next to its league context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClutchDetail {
    pub name: String,
    pub performance: CategoryPerformance,
    pub league: PopulationSummary,
}

// ---------------------------------------------------------------------------
// Roster context
// ---------------------------------------------------------------------------

/// League baselines for one scoring pass, computed once per roster snapshot.
#[derive(Debug, Clone)]
pub struct RosterContext<'a> {
    categories: &'a CategorySet,
    options: ScoringOptions,
    baselines: BTreeMap<LeafMetric, PoolStats>,
    eligible_players: usize,
}

impl<'a> RosterContext<'a> {
    pub fn build(
        roster: &[PlayerSeasonProfile],
        tree: &WeightTree,
        categories: &'a CategorySet,
        options: ScoringOptions,
    ) -> Result<RosterContext<'a>, ScoringError> {
        tree.check_categories(categories)?;

        let eligible = filter_eligible(roster, options.mode, &options.thresholds);
        let mut ctx = RosterContext {
            categories,
            options,
            baselines: BTreeMap::new(),
            eligible_players: eligible.len(),
        };

        let mut metrics = tree.leaf_metrics();
        metrics.sort();
        metrics.dedup();

        for metric in metrics {
            let values: Vec<f64> = eligible
                .iter()
                .filter_map(|p| ctx.baseline_value(p, metric))
                .collect();
            let stats = compute_pool_stats(&values);
            debug!(
                "baseline {:?}: n={} mean={:.4} stdev={:.4}",
                metric, stats.count, stats.mean, stats.stdev
            );
            ctx.baselines.insert(metric, stats);
        }

        Ok(ctx)
    }

    pub fn eligible_players(&self) -> usize {
        self.eligible_players
    }

    pub fn baseline(&self, metric: LeafMetric) -> Option<&PoolStats> {
        self.baselines.get(&metric)
    }

    /// Score one profile against this context's baselines.
    pub fn score(&self, profile: &PlayerSeasonProfile, tree: &WeightTree) -> ScoreBreakdown {
        let (mut components, bases): (Vec<ComponentScore>, Vec<Option<f64>>) = tree
            .components
            .iter()
            .map(|c| self.score_component(profile, c))
            .unzip();
        let (overall, _) = fold_children(&mut components, &bases);

        ScoreBreakdown {
            player_id: profile.player_id.clone(),
            name: profile.name.clone(),
            team: profile.team.clone(),
            season: profile.season,
            eligible: is_eligible(profile, self.options.mode, &self.options.thresholds),
            overall: overall.unwrap_or(0.0),
            components,
        }
    }

    /// The scored node plus what it would score with no postseason data.
    fn score_component(
        &self,
        profile: &PlayerSeasonProfile,
        component: &WeightedComponent,
    ) -> (ComponentScore, Option<f64>) {
        match &component.body {
            ComponentBody::Leaf(metric) => {
                let raw = self.raw_value(profile, *metric);
                let score = raw.map(|r| self.leaf_score(*metric, r));
                let base = if metric.requires_playoffs() { None } else { score };
                let node = ComponentScore {
                    key: component.key,
                    weight: component.weight,
                    effective_weight: 0.0,
                    score,
                    raw,
                    children: Vec::new(),
                };
                (node, base)
            }
            ComponentBody::Branch(children) => {
                let (mut scored, bases): (Vec<ComponentScore>, Vec<Option<f64>>) = children
                    .iter()
                    .map(|c| self.score_component(profile, c))
                    .unzip();
                let (score, base) = fold_children(&mut scored, &bases);
                let node = ComponentScore {
                    key: component.key,
                    weight: component.weight,
                    effective_weight: 0.0,
                    score,
                    raw: None,
                    children: scored,
                };
                (node, base)
            }
        }
    }

    /// Population-relative 0-100 score for one leaf value.
    fn leaf_score(&self, metric: LeafMetric, raw: f64) -> f64 {
        let z = self
            .baselines
            .get(&metric)
            .map(|b| compute_zscore(raw, b))
            .unwrap_or(0.0);
        let oriented = if metric.lower_is_better() { -z } else { z };
        z_to_unit(oriented) * SCORE_SCALE
    }

    /// Like `raw_value`, but clutch leaves with thin samples stay out of the
    /// league baseline.
    fn baseline_value(&self, profile: &PlayerSeasonProfile, metric: LeafMetric) -> Option<f64> {
        if let Some(perf) = self.clutch_performance(profile, metric) {
            if perf.total_attempts < self.options.min_category_attempts {
                return None;
            }
        }
        self.raw_value(profile, metric)
    }

    fn clutch_performance(&self, profile: &PlayerSeasonProfile, metric: LeafMetric) -> Option<CategoryPerformance> {
        if metric.requires_playoffs() && !self.options.include_playoffs {
            return None;
        }
        let category = self.categories.get(metric.category_key()?)?;
        Some(profile.category_performance(category))
    }

    fn line<'p>(&self, profile: &'p PlayerSeasonProfile) -> &'p SeasonLine {
        match self.options.mode {
            ScoringMode::SingleSeason { .. } => &profile.season_line,
            ScoringMode::Career { .. } => &profile.career_line,
        }
    }

    /// The raw number behind a leaf, or `None` when the player has no data
    /// for it (or it is switched off).
    fn raw_value(&self, profile: &PlayerSeasonProfile, metric: LeafMetric) -> Option<f64> {
        if metric.requires_playoffs() && !self.options.include_playoffs {
            return None;
        }
        let line = self.line(profile);
        let playoffs = profile.playoffs.filter(|_| profile.has_playoffs());

        match metric {
            LeafMetric::TeamWinPct => line.win_pct(),
            LeafMetric::TeamPointsPerGame => line.per_game(line.team_points),
            LeafMetric::PlayoffWins => playoffs.map(|p| p.wins as f64),
            LeafMetric::PlayoffWinPct => playoffs.and_then(|p| p.win_pct()),
            LeafMetric::AnyPerAttempt => rate(line, MetricKind::AnyPerAttempt),
            LeafMetric::TouchdownRate => rate(line, MetricKind::TouchdownRate),
            LeafMetric::CompletionRate => rate(line, MetricKind::CompletionRate),
            LeafMetric::SackRate => rate(line, MetricKind::SackRate),
            LeafMetric::TurnoverRate => rate(line, MetricKind::TurnoverRate),
            LeafMetric::PassYardsPerGame => line.per_game(line.passing.yards),
            LeafMetric::PassTouchdownsPerGame => line.per_game(line.passing.touchdowns),
            LeafMetric::RushYardsPerGame => line.per_game(line.passing.rush_yards),
            LeafMetric::ClutchThirdDown
            | LeafMetric::ClutchRedZone
            | LeafMetric::ClutchLateSeason
            | LeafMetric::ClutchPlayoffs => self
                .clutch_performance(profile, metric)
                .filter(|p| p.has_data)
                .map(|p| p.normalized_score),
            LeafMetric::Availability => line.availability(),
            LeafMetric::Consistency => self.consistency(profile),
            LeafMetric::OffensiveLine => profile.support.offensive_line_rank,
            LeafMetric::Weapons => profile.support.weapons_rank,
            LeafMetric::Defense => profile.support.defense_rank,
        }
    }

    /// Share of seasons in the window where the player started enough games
    /// to count as the starter. An in-progress season is left out.
    fn consistency(&self, profile: &PlayerSeasonProfile) -> Option<f64> {
        let (first, last) = match self.options.mode {
            ScoringMode::SingleSeason { season, status } => {
                let last = match status {
                    SeasonStatus::Completed => season,
                    SeasonStatus::InProgress => season.checked_sub(1)?,
                };
                (season.saturating_sub(CONSISTENCY_WINDOW - 1), last)
            }
            ScoringMode::Career { through_season } => (0, through_season),
        };

        let seasons: Vec<_> = profile
            .history
            .iter()
            .filter(|s| s.season >= first && s.season <= last && s.scheduled_games > 0)
            .collect();
        if seasons.is_empty() {
            return None;
        }
        let full = seasons
            .iter()
            .filter(|s| s.games_started >= self.options.thresholds.completed_min_starts)
            .count();
        Some(full as f64 / seasons.len() as f64)
    }
}

fn rate(line: &SeasonLine, kind: MetricKind) -> Option<f64> {
    let stats = line.stats();
    if !kind.is_present(&stats) {
        return None;
    }
    Some(compute_metric(kind, &stats))
}

/// Weighted average of `siblings`, or of their no-postseason `bases` when
/// that is higher, so postseason data only ever adds to a parent. Returns the
/// chosen score and the parent's own no-postseason score, and sets each
/// sibling's effective weight to match the choice.
fn fold_children(siblings: &mut [ComponentScore], bases: &[Option<f64>]) -> (Option<f64>, Option<f64>) {
    let with_playoffs = combine_weighted(siblings.iter().map(|c| (c.score, c.weight)));
    let without_playoffs = combine_weighted(bases.iter().zip(siblings.iter()).map(|(b, c)| (*b, c.weight)));

    let use_playoffs = match (with_playoffs, without_playoffs) {
        (Some(with), Some(without)) => with >= without,
        (_, None) => true,
        (None, Some(_)) => false,
    };

    let used: Vec<bool> = if use_playoffs {
        siblings.iter().map(|c| c.score.is_some()).collect()
    } else {
        bases.iter().map(Option::is_some).collect()
    };
    assign_effective_weights(siblings, &used);

    let score = if use_playoffs { with_playoffs } else { without_playoffs };
    (score, without_playoffs)
}

/// `used[i]` is true when that sibling's score went into the parent.
fn assign_effective_weights(siblings: &mut [ComponentScore], used: &[bool]) {
    let contributes = |c: &ComponentScore, i: usize| c.weight > 0.0 && used.get(i).copied().unwrap_or(false);
    let total: f64 = siblings
        .iter()
        .enumerate()
        .filter(|(i, c)| contributes(c, *i))
        .map(|(_, c)| c.weight)
        .sum();
    for (i, c) in siblings.iter_mut().enumerate() {
        c.effective_weight = if total > 0.0 && contributes(c, i) {
            c.weight / total
        } else {
            0.0
        };
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Score one player against the full roster for the same season.
pub fn compose_score(
    profile: &PlayerSeasonProfile,
    tree: &WeightTree,
    roster: &[PlayerSeasonProfile],
    categories: &CategorySet,
    options: ScoringOptions,
) -> Result<ScoreBreakdown, ScoringError> {
    let ctx = RosterContext::build(roster, tree, categories, options)?;
    Ok(ctx.score(profile, tree))
}

/// Score every eligible player on the roster, best first.
///
/// Ties on the overall score are broken by player id so the order is stable
/// across runs.
pub fn compose_all(
    roster: &[PlayerSeasonProfile],
    tree: &WeightTree,
    categories: &CategorySet,
    options: ScoringOptions,
) -> Result<Vec<ScoreBreakdown>, ScoringError> {
    let ctx = RosterContext::build(roster, tree, categories, options)?;
    let eligible = filter_eligible(roster, options.mode, &options.thresholds);

    let mut scores: Vec<ScoreBreakdown> = eligible
        .par_iter()
        .map(|p| ctx.score(p, tree))
        .collect();

    scores.sort_by(|a, b| {
        b.overall
            .partial_cmp(&a.overall)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.player_id.cmp(&b.player_id))
    });

    debug!(
        "scored {} eligible of {} rostered players",
        scores.len(),
        roster.len()
    );
    Ok(scores)
}

/// Per-category clutch results for one player with league averages over the
/// eligible roster.
pub fn clutch_details(
    profile: &PlayerSeasonProfile,
    roster: &[PlayerSeasonProfile],
    categories: &CategorySet,
    options: ScoringOptions,
) -> Vec<ClutchDetail> {
    let eligible = filter_eligible(roster, options.mode, &options.thresholds);

    categories
        .iter()
        .map(|category| {
            let per_player: BTreeMap<PlayerId, _> = eligible
                .iter()
                .map(|p| (p.player_id.clone(), p.category_stats(category)))
                .collect();
            ClutchDetail {
                name: category.name.clone(),
                performance: profile.category_performance(category),
                league: compare_across_population(&per_player, category, options.min_category_attempts),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::default_clutch_categories;
    use crate::profile::{PlayoffLine, SeasonSummary, SupportContext};
    use crate::stats::{SituationalRecord, StatTotals};

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn options() -> ScoringOptions {
        ScoringOptions::new(ScoringMode::SingleSeason {
            season: 2023,
            status: SeasonStatus::Completed,
        })
    }

    /// A 2023 starter whose quality scales with `q` (0.0 worst, 1.0 best).
    fn make_profile(id: &str, q: f64, starts: u32) -> PlayerSeasonProfile {
        let attempts = 30.0 * starts as f64;
        let passing = StatTotals {
            attempts,
            completions: attempts * (0.55 + 0.15 * q),
            yards: attempts * (6.0 + 2.5 * q),
            touchdowns: attempts * (0.03 + 0.03 * q),
            interceptions: attempts * (0.035 - 0.02 * q),
            sacks: attempts * (0.09 - 0.05 * q),
            sack_yards: attempts * (0.5 - 0.3 * q),
            first_downs: attempts * (0.30 + 0.1 * q),
            fumbles: 4.0,
            fumbles_lost: 2.0,
            rush_attempts: 40.0,
            rush_yards: 150.0 + 200.0 * q,
            rush_touchdowns: 2.0,
        };
        let third_down = StatTotals {
            attempts: 100.0,
            completions: 55.0 + 15.0 * q,
            first_downs: 35.0 + 15.0 * q,
            sacks: 8.0 - 4.0 * q,
            interceptions: 3.0 - 2.0 * q,
            ..StatTotals::default()
        };
        PlayerSeasonProfile {
            player_id: id.into(),
            name: format!("Player {id}"),
            team: "TST".into(),
            season: 2023,
            age: Some(28),
            season_line: SeasonLine {
                games_played: starts,
                games_started: starts,
                scheduled_games: 17,
                wins: (starts as f64 * q).round() as u32,
                losses: starts - (starts as f64 * q).round() as u32,
                ties: 0,
                team_points: starts as f64 * (17.0 + 12.0 * q),
                passing,
            },
            career_line: SeasonLine::default(),
            history: vec![
                SeasonSummary { season: 2021, games_started: 17, scheduled_games: 17 },
                SeasonSummary { season: 2022, games_started: 12, scheduled_games: 17 },
                SeasonSummary { season: 2023, games_started: starts, scheduled_games: 17 },
            ],
            playoffs: None,
            splits: vec![SituationalRecord::new("Down & Yards to Go", "3rd & 4-6", third_down)],
            support: SupportContext {
                offensive_line_rank: Some(16.0),
                weapons_rank: Some(16.0),
                defense_rank: Some(16.0),
            },
        }
    }

    fn roster() -> Vec<PlayerSeasonProfile> {
        vec![
            make_profile("a", 1.0, 17),
            make_profile("b", 0.5, 17),
            make_profile("c", 0.0, 17),
            make_profile("backup", 0.9, 3),
        ]
    }

    #[test]
    fn better_player_ranks_higher() {
        let scores = compose_all(&roster(), &WeightTree::default(), &default_clutch_categories(), options()).unwrap();
        let ids: Vec<&str> = scores.iter().map(|s| s.player_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(scores.iter().all(|s| (0.0..=100.0).contains(&s.overall)));
    }

    #[test]
    fn ineligible_players_are_not_scored() {
        let scores = compose_all(&roster(), &WeightTree::default(), &default_clutch_categories(), options()).unwrap();
        assert!(scores.iter().all(|s| s.player_id != "backup"));
        assert!(scores.iter().all(|s| s.eligible));
    }

    #[test]
    fn identical_inputs_give_identical_output() {
        let roster = roster();
        let tree = WeightTree::default();
        let categories = default_clutch_categories();
        let first = compose_score(&roster[1], &tree, &roster, &categories, options()).unwrap();
        let second = compose_score(&roster[1], &tree, &roster, &categories, options()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.overall.to_bits(), second.overall.to_bits());
    }

    #[test]
    fn average_player_sits_at_midpoint() {
        // b is exactly between a and c on every linear input.
        let roster = roster();
        let tree = WeightTree::from_json(r#"{"stats": {"efficiency": {"completion_rate": 1}}}"#).unwrap();
        let b = compose_score(&roster[1], &tree, &roster, &default_clutch_categories(), options()).unwrap();
        assert!(approx_eq(b.overall, 50.0, 1e-9));
    }

    #[test]
    fn all_zero_weights_score_zero() {
        let tree = WeightTree::from_json(
            r#"{"team": 0, "stats": 0, "clutch": 0, "durability": 0, "support": 0}"#,
        )
        .unwrap();
        let roster = roster();
        let b = compose_score(&roster[0], &tree, &roster, &default_clutch_categories(), options()).unwrap();
        assert_eq!(b.overall, 0.0);
        assert!(!b.overall.is_nan());
    }

    #[test]
    fn playoff_leaves_drop_out_without_playoffs() {
        let roster = roster();
        let tree = WeightTree::default();
        let b = compose_score(&roster[0], &tree, &roster, &default_clutch_categories(), options()).unwrap();

        let playoffs = b.at("team.playoffs").unwrap();
        assert!(playoffs.score.is_none());
        assert_eq!(playoffs.effective_weight, 0.0);

        let clutch_playoffs = b.at("clutch.playoffs").unwrap();
        assert!(clutch_playoffs.score.is_none());

        // The remaining team weights renormalize over 50 + 30.
        let regular = b.at("team.regular_season").unwrap();
        assert!(approx_eq(regular.effective_weight, 50.0 / 80.0, 1e-12));
    }

    #[test]
    fn include_playoffs_flag_gates_playoff_leaves() {
        let mut roster = roster();
        for (i, p) in roster.iter_mut().enumerate() {
            p.playoffs = Some(PlayoffLine {
                games: 2,
                wins: 2 - (i as u32 % 3).min(2),
                losses: (i as u32 % 3).min(2),
                passing: StatTotals {
                    attempts: 70.0,
                    completions: 40.0 + 5.0 * i as f64,
                    touchdowns: 3.0,
                    ..StatTotals::default()
                },
            });
        }
        let tree = WeightTree::default();
        let categories = default_clutch_categories();

        let on = compose_score(&roster[0], &tree, &roster, &categories, options()).unwrap();
        assert!(on.at("team.playoffs.wins").unwrap().score.is_some());
        assert!(on.at("clutch.playoffs").unwrap().score.is_some());

        let mut off_opts = options();
        off_opts.include_playoffs = false;
        let off = compose_score(&roster[0], &tree, &roster, &categories, off_opts).unwrap();
        assert!(off.at("team.playoffs").unwrap().score.is_none());
        assert!(off.at("clutch.playoffs").unwrap().score.is_none());
    }

    #[test]
    fn playoff_loss_never_costs_points() {
        let tree = WeightTree::default();
        let categories = default_clutch_categories();
        let without = roster();
        let mut with = roster();
        with[0].playoffs = Some(PlayoffLine {
            games: 1,
            wins: 0,
            losses: 1,
            passing: StatTotals {
                attempts: 40.0,
                completions: 20.0,
                yards: 210.0,
                touchdowns: 1.0,
                interceptions: 2.0,
                sacks: 4.0,
                ..StatTotals::default()
            },
        });

        let before = compose_score(&without[0], &tree, &without, &categories, options()).unwrap();
        let after = compose_score(&with[0], &tree, &with, &categories, options()).unwrap();

        assert!(after.overall >= before.overall - 1e-9);
        for key in ["team", "clutch"] {
            let b = before.component(key).unwrap().score.unwrap();
            let a = after.component(key).unwrap().score.unwrap();
            assert!(a >= b - 1e-9, "{key}: {a} < {b}");
        }

        // The lone playoff line sits at the midpoint, below a's regular season,
        // so it is shown but carries no weight.
        let playoffs = after.at("team.playoffs").unwrap();
        assert!(playoffs.score.is_some());
        assert_eq!(playoffs.effective_weight, 0.0);
    }

    #[test]
    fn missing_branch_data_reduces_denominator() {
        let mut roster = roster();
        for p in roster.iter_mut() {
            p.support = SupportContext::default();
        }
        let tree = WeightTree::default();
        let a = compose_score(&roster[0], &tree, &roster, &default_clutch_categories(), options()).unwrap();
        let support = a.component("support").unwrap();
        assert!(support.score.is_none());
        assert_eq!(support.effective_weight, 0.0);

        let shares: f64 = a.components.iter().map(|c| c.effective_weight).sum();
        assert!(approx_eq(shares, 1.0, 1e-12));
    }

    #[test]
    fn lower_is_better_leaves_are_inverted() {
        let roster = roster();
        let tree = WeightTree::default();
        let categories = default_clutch_categories();
        let a = compose_score(&roster[0], &tree, &roster, &categories, options()).unwrap();
        let c = compose_score(&roster[2], &tree, &roster, &categories, options()).unwrap();
        let a_sack = a.at("stats.protection.sack_rate").unwrap();
        let c_sack = c.at("stats.protection.sack_rate").unwrap();
        assert!(a_sack.raw.unwrap() < c_sack.raw.unwrap());
        assert!(a_sack.score.unwrap() > c_sack.score.unwrap());
    }

    #[test]
    fn tougher_supporting_cast_earns_more_credit() {
        let mut roster = roster();
        roster[0].support.offensive_line_rank = Some(30.0);
        roster[2].support.offensive_line_rank = Some(2.0);
        let tree = WeightTree::default();
        let categories = default_clutch_categories();
        let a = compose_score(&roster[0], &tree, &roster, &categories, options()).unwrap();
        let c = compose_score(&roster[2], &tree, &roster, &categories, options()).unwrap();
        let a_line = a.at("support.offensive_line").unwrap().score.unwrap();
        let c_line = c.at("support.offensive_line").unwrap().score.unwrap();
        assert!(a_line > 50.0);
        assert!(c_line < 50.0);
    }

    #[test]
    fn consistency_counts_full_seasons_in_window() {
        let roster = roster();
        let tree = WeightTree::default();
        let a = compose_score(&roster[0], &tree, &roster, &default_clutch_categories(), options()).unwrap();
        // 2021: 17, 2022: 12, 2023: 17 starts -> all three at or above 9
        assert!(approx_eq(a.at("durability.consistency").unwrap().raw.unwrap(), 1.0, 1e-12));
    }

    #[test]
    fn in_progress_season_leaves_current_year_out_of_consistency() {
        let mut roster = roster();
        for p in roster.iter_mut() {
            p.history[1].games_started = 2;
        }
        let mut opts = options();
        opts.mode = ScoringMode::SingleSeason { season: 2023, status: SeasonStatus::InProgress };
        let tree = WeightTree::default();
        let a = compose_score(&roster[0], &tree, &roster, &default_clutch_categories(), opts).unwrap();
        // Only 2021 (full) and 2022 (2 starts) count.
        assert!(approx_eq(a.at("durability.consistency").unwrap().raw.unwrap(), 0.5, 1e-12));
    }

    #[test]
    fn missing_category_is_a_configuration_error() {
        let roster = roster();
        let mut categories = default_clutch_categories();
        categories.categories.retain(|c| c.key != "third_down");
        let err = compose_all(&roster, &WeightTree::default(), &categories, options()).unwrap_err();
        assert_eq!(err, ScoringError::MissingCategory { key: "third_down".into() });
    }

    #[test]
    fn clutch_details_report_league_context() {
        let roster = roster();
        let details = clutch_details(&roster[0], &roster, &default_clutch_categories(), options());
        assert_eq!(details.len(), 4);

        let third = &details[0];
        assert_eq!(third.performance.category_key, "third_down");
        assert!(third.performance.has_data);
        // Backup is ineligible; three starters qualify.
        assert_eq!(third.league.qualified_players, 3);
        assert!(third.league.mean(MetricKind::ConversionRate).is_some());

        let red_zone = &details[1];
        assert!(!red_zone.performance.has_data);
        assert_eq!(red_zone.league.qualified_players, 0);
    }

    #[test]
    fn career_mode_reads_career_line() {
        let mut roster = roster();
        for p in roster.iter_mut() {
            p.career_line = p.season_line;
            p.career_line += &p.season_line;
        }
        let mut opts = options();
        opts.mode = ScoringMode::Career { through_season: 2023 };
        let scores = compose_all(&roster, &WeightTree::default(), &default_clutch_categories(), opts).unwrap();
        let ids: Vec<&str> = scores.iter().map(|s| s.player_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        let a = &scores[0];
        assert!(approx_eq(a.at("durability.availability").unwrap().raw.unwrap(), 1.0, 1e-12));
    }
}
