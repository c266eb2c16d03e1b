// Scoring inputs: one player's season (or career window) as the engine sees it.

use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

use crate::category::{normalize, Category, CategoryPerformance, CategoryScope, CategorySet};
use crate::stats::{AggregatedStats, SituationalRecord, StatTotals};

pub type PlayerId = String;

// ---------------------------------------------------------------------------
// Season lines
// ---------------------------------------------------------------------------

/// Regular-season totals for one season, or summed over a career window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonLine {
    pub games_played: u32,
    pub games_started: u32,
    /// Games on the team's schedule; the availability denominator.
    pub scheduled_games: u32,
    /// Record as the starting quarterback.
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    /// Points scored by the team in the player's games.
    pub team_points: f64,
    pub passing: StatTotals,
}

impl SeasonLine {
    pub fn stats(&self) -> AggregatedStats {
        AggregatedStats::from_totals(self.passing)
    }

    /// Win percentage with ties as half a win. `None` without decisions.
    pub fn win_pct(&self) -> Option<f64> {
        let decisions = self.wins + self.losses + self.ties;
        if decisions == 0 {
            return None;
        }
        Some((self.wins as f64 + 0.5 * self.ties as f64) / decisions as f64)
    }

    /// Per-game rate over games played. `None` when the player never played.
    pub fn per_game(&self, value: f64) -> Option<f64> {
        if self.games_played == 0 {
            return None;
        }
        Some(value / self.games_played as f64)
    }

    /// Share of scheduled games the player started.
    pub fn availability(&self) -> Option<f64> {
        if self.scheduled_games == 0 {
            return None;
        }
        Some((self.games_started as f64 / self.scheduled_games as f64).min(1.0))
    }
}

impl AddAssign<&SeasonLine> for SeasonLine {
    fn add_assign(&mut self, rhs: &SeasonLine) {
        self.games_played += rhs.games_played;
        self.games_started += rhs.games_started;
        self.scheduled_games += rhs.scheduled_games;
        self.wins += rhs.wins;
        self.losses += rhs.losses;
        self.ties += rhs.ties;
        if rhs.team_points.is_finite() {
            self.team_points += rhs.team_points;
        }
        self.passing += &rhs.passing;
    }
}

/// Start counts for one season, kept for recency and durability checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonSummary {
    pub season: u16,
    pub games_started: u32,
    pub scheduled_games: u32,
}

/// Postseason totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayoffLine {
    pub games: u32,
    pub wins: u32,
    pub losses: u32,
    pub passing: StatTotals,
}

impl PlayoffLine {
    pub fn win_pct(&self) -> Option<f64> {
        let decisions = self.wins + self.losses;
        if decisions == 0 {
            return None;
        }
        Some(self.wins as f64 / decisions as f64)
    }
}

impl AddAssign<&PlayoffLine> for PlayoffLine {
    fn add_assign(&mut self, rhs: &PlayoffLine) {
        self.games += rhs.games;
        self.wins += rhs.wins;
        self.losses += rhs.losses;
        self.passing += &rhs.passing;
    }
}

/// League ranks (1 = best) of the units around the quarterback. A worse
/// unit means a harder job, which earns more support credit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupportContext {
    pub offensive_line_rank: Option<f64>,
    pub weapons_rank: Option<f64>,
    pub defense_rank: Option<f64>,
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Everything the engine needs to score one player for one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSeasonProfile {
    pub player_id: PlayerId,
    pub name: String,
    pub team: String,
    pub season: u16,
    #[serde(default)]
    pub age: Option<u16>,
    pub season_line: SeasonLine,
    pub career_line: SeasonLine,
    #[serde(default)]
    pub history: Vec<SeasonSummary>,
    #[serde(default)]
    pub playoffs: Option<PlayoffLine>,
    #[serde(default)]
    pub splits: Vec<SituationalRecord>,
    #[serde(default)]
    pub support: SupportContext,
}

impl PlayerSeasonProfile {
    /// Most recent season in the player's history, falling back to `season`.
    pub fn last_season_played(&self) -> u16 {
        self.history
            .iter()
            .filter(|s| s.games_started > 0)
            .map(|s| s.season)
            .max()
            .unwrap_or(self.season)
    }

    /// Career starts, from the career line.
    pub fn career_starts(&self) -> u32 {
        self.career_line.games_started
    }

    /// True when the player appeared in at least one postseason game.
    pub fn has_playoffs(&self) -> bool {
        self.playoffs.is_some_and(|p| p.games > 0 || p.passing.attempts > 0.0)
    }

    /// Stats a category draws from for this player.
    pub fn category_stats(&self, category: &Category) -> AggregatedStats {
        match category.scope {
            CategoryScope::Splits => category.aggregate_splits(&self.splits),
            CategoryScope::PlayoffTotals => self
                .playoffs
                .map(|p| AggregatedStats::from_totals(p.passing))
                .unwrap_or_default(),
        }
    }

    pub fn category_performance(&self, category: &Category) -> CategoryPerformance {
        normalize(&self.category_stats(category), category)
    }

    /// Performances for every category in the set, in set order.
    pub fn clutch_performances(&self, categories: &CategorySet) -> Vec<CategoryPerformance> {
        categories
            .iter()
            .map(|c| self.category_performance(c))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
