// Sample-size eligibility for scoring and for league baselines.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::profile::PlayerSeasonProfile;

/// Whether a season's games are all played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonStatus {
    Completed,
    InProgress,
}

/// What window of a player's record is being scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScoringMode {
    SingleSeason { season: u16, status: SeasonStatus },
    Career { through_season: u16 },
}

impl ScoringMode {
    /// The last season inside the scoring window.
    pub fn final_season(&self) -> u16 {
        match *self {
            ScoringMode::SingleSeason { season, .. } => season,
            ScoringMode::Career { through_season } => through_season,
        }
    }
}

/// Minimum games-started thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EligibilityThresholds {
    /// Separates starters from backups in a finished season.
    pub completed_min_starts: u32,
    /// Early in a season any starter counts.
    pub in_progress_min_starts: u32,
    pub career_min_starts: u32,
    /// A career-mode player must have started within this many seasons.
    pub recency_window: u16,
}

impl Default for EligibilityThresholds {
    fn default() -> Self {
        EligibilityThresholds {
            completed_min_starts: 9,
            in_progress_min_starts: 1,
            career_min_starts: 15,
            recency_window: 2,
        }
    }
}

/// Whether `profile` has enough sample to be scored under `mode`.
pub fn is_eligible(
    profile: &PlayerSeasonProfile,
    mode: ScoringMode,
    thresholds: &EligibilityThresholds,
) -> bool {
    match mode {
        ScoringMode::SingleSeason { season, status } => {
            if profile.season != season {
                debug!(
                    "{} profile is for {}, not {}",
                    profile.player_id, profile.season, season
                );
                return false;
            }
            let min_starts = match status {
                SeasonStatus::Completed => thresholds.completed_min_starts,
                SeasonStatus::InProgress => thresholds.in_progress_min_starts,
            };
            profile.season_line.games_started >= min_starts
        }
        ScoringMode::Career { through_season } => {
            let window = thresholds.recency_window.max(1);
            let earliest_recent = through_season.saturating_sub(window - 1);
            profile.career_starts() >= thresholds.career_min_starts
                && profile.last_season_played() >= earliest_recent
        }
    }
}

/// Keep only eligible profiles, preserving order.
pub fn filter_eligible<'a>(
    profiles: &'a [PlayerSeasonProfile],
    mode: ScoringMode,
    thresholds: &EligibilityThresholds,
) -> Vec<&'a PlayerSeasonProfile> {
    let eligible: Vec<&PlayerSeasonProfile> = profiles
        .iter()
        .filter(|p| is_eligible(p, mode, thresholds))
        .collect();
    debug!(
        "{} of {} profiles eligible under {:?}",
        eligible.len(),
        profiles.len(),
        mode
    );
    eligible
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
