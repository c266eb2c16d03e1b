// Roster data loading and profile assembly.
//
// Reads three CSV files keyed by player_id: regular-season lines, situational
// splits, and playoff lines. Cells are read as text so one bad value costs a
// warning instead of the whole row.

use crate::config::{Config, DataPaths};
use qbrank_core::eligibility::ScoringMode;
use qbrank_core::profile::{
    PlayerId, PlayerSeasonProfile, PlayoffLine, SeasonLine, SeasonSummary, SupportContext,
};
use qbrank_core::stats::{SituationalRecord, StatTotals};
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One row of the seasons CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonRow {
    pub player_id: PlayerId,
    pub name: String,
    pub team: String,
    pub season: u16,
    pub age: Option<u16>,
    pub line: SeasonLine,
    pub support: SupportContext,
}

/// One row of the splits CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitRow {
    pub player_id: PlayerId,
    pub season: u16,
    pub record: SituationalRecord,
}

/// One row of the playoffs CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayoffRow {
    pub player_id: PlayerId,
    pub season: u16,
    pub line: PlayoffLine,
}

/// Everything read from disk, before it is shaped for a scoring mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RosterData {
    pub seasons: Vec<SeasonRow>,
    pub splits: Vec<SplitRow>,
    pub playoffs: Vec<PlayoffRow>,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Cell coercion
// ---------------------------------------------------------------------------

const STAT_COLUMNS: [&str; 13] = [
    "attempts",
    "completions",
    "yards",
    "touchdowns",
    "interceptions",
    "sacks",
    "sack_yards",
    "first_downs",
    "fumbles",
    "fumbles_lost",
    "rush_attempts",
    "rush_yards",
    "rush_touchdowns",
];

/// A CSV row as column → cell text.
struct Row {
    fields: HashMap<String, String>,
    player_id: String,
}

impl Row {
    /// `None` (after a warning) when the row has no player id.
    fn new(fields: HashMap<String, String>, file: &str) -> Option<Row> {
        let player_id = fields
            .get("player_id")
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        if player_id.is_empty() {
            warn!("skipping {} row without player_id", file);
            return None;
        }
        Some(Row { fields, player_id })
    }

    fn cell(&self, column: &str) -> &str {
        self.fields.get(column).map(|s| s.trim()).unwrap_or("")
    }

    fn text(&self, column: &str) -> String {
        self.cell(column).to_string()
    }

    /// Numeric cell; empty or unparseable cells become 0. An absent column
    /// was already reported once for the whole file.
    fn number(&self, column: &str) -> f64 {
        let Some(raw) = self.fields.get(column).map(|s| s.trim()) else {
            return 0.0;
        };
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => {
                warn!(
                    "player '{}': column '{}' has non-numeric value '{}', using 0",
                    self.player_id, column, raw
                );
                0.0
            }
        }
    }

    fn count(&self, column: &str) -> u32 {
        self.number(column).round().max(0.0) as u32
    }

    /// Numeric cell that may legitimately be blank.
    fn optional(&self, column: &str) -> Option<f64> {
        let raw = self.cell(column);
        if raw.is_empty() {
            return None;
        }
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Some(v),
            _ => {
                warn!(
                    "player '{}': column '{}' has non-numeric value '{}', treating as missing",
                    self.player_id, column, raw
                );
                None
            }
        }
    }

    fn season(&self, file: &str) -> Option<u16> {
        let raw = self.cell("season");
        match raw.parse::<u16>() {
            Ok(season) if season > 0 => Some(season),
            _ => {
                warn!(
                    "skipping {} row for '{}': invalid season '{}'",
                    file, self.player_id, raw
                );
                None
            }
        }
    }

    fn stat_totals(&self) -> StatTotals {
        let [
            attempts,
            completions,
            yards,
            touchdowns,
            interceptions,
            sacks,
            sack_yards,
            first_downs,
            fumbles,
            fumbles_lost,
            rush_attempts,
            rush_yards,
            rush_touchdowns,
        ] = STAT_COLUMNS.map(|c| self.number(c));
        StatTotals {
            attempts,
            completions,
            yards,
            touchdowns,
            interceptions,
            sacks,
            sack_yards,
            first_downs,
            fumbles,
            fumbles_lost,
            rush_attempts,
            rush_yards,
            rush_touchdowns,
        }
    }
}

// ---------------------------------------------------------------------------
// Reader-based loaders (private, enable testing without temp files)
// ---------------------------------------------------------------------------

const SEASON_COLUMNS: [&str; 10] = [
    "name",
    "team",
    "season",
    "games_played",
    "games_started",
    "scheduled_games",
    "wins",
    "losses",
    "ties",
    "team_points",
];
const SPLIT_COLUMNS: [&str; 3] = ["season", "split_type", "split_value"];
const PLAYOFF_COLUMNS: [&str; 4] = ["season", "games", "wins", "losses"];

/// Expected columns absent from the header row, in `expected` order.
fn missing_columns<'a, I>(headers: &csv::StringRecord, expected: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    expected
        .into_iter()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect()
}

fn rows_from_reader<'a, R, I>(rdr: R, file: &str, expected: I) -> Result<Vec<Row>, csv::Error>
where
    R: Read,
    I: IntoIterator<Item = &'a str>,
{
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(rdr);
    for column in missing_columns(reader.headers()?, expected) {
        warn!("{} CSV has no '{}' column, reading it as 0", file, column);
    }
    let mut rows = Vec::new();
    for result in reader.deserialize::<HashMap<String, String>>() {
        match result {
            Ok(fields) => rows.extend(Row::new(fields, file)),
            Err(e) => {
                warn!("skipping malformed {} row: {}", file, e);
            }
        }
    }
    Ok(rows)
}

fn load_seasons_from_reader<R: Read>(rdr: R) -> Result<Vec<SeasonRow>, csv::Error> {
    let mut seasons = Vec::new();
    for row in rows_from_reader(rdr, "seasons", SEASON_COLUMNS.into_iter().chain(STAT_COLUMNS))? {
        let Some(season) = row.season("seasons") else {
            continue;
        };
        seasons.push(SeasonRow {
            name: row.text("name"),
            team: row.text("team"),
            season,
            age: row.optional("age").map(|a| a.round().max(0.0) as u16),
            line: SeasonLine {
                games_played: row.count("games_played"),
                games_started: row.count("games_started"),
                scheduled_games: row.count("scheduled_games"),
                wins: row.count("wins"),
                losses: row.count("losses"),
                ties: row.count("ties"),
                team_points: row.number("team_points"),
                passing: row.stat_totals(),
            },
            support: SupportContext {
                offensive_line_rank: row.optional("oline_rank"),
                weapons_rank: row.optional("weapons_rank"),
                defense_rank: row.optional("defense_rank"),
            },
            player_id: row.player_id,
        });
    }
    Ok(seasons)
}

fn load_splits_from_reader<R: Read>(rdr: R) -> Result<Vec<SplitRow>, csv::Error> {
    let mut splits = Vec::new();
    for row in rows_from_reader(rdr, "splits", SPLIT_COLUMNS.into_iter().chain(STAT_COLUMNS))? {
        let Some(season) = row.season("splits") else {
            continue;
        };
        let split_type = row.text("split_type");
        if split_type.is_empty() {
            warn!("skipping split row for '{}': empty split_type", row.player_id);
            continue;
        }
        splits.push(SplitRow {
            season,
            record: SituationalRecord::new(split_type, row.text("split_value"), row.stat_totals()),
            player_id: row.player_id,
        });
    }
    Ok(splits)
}

fn load_playoffs_from_reader<R: Read>(rdr: R) -> Result<Vec<PlayoffRow>, csv::Error> {
    let mut playoffs = Vec::new();
    for row in rows_from_reader(rdr, "playoffs", PLAYOFF_COLUMNS.into_iter().chain(STAT_COLUMNS))? {
        let Some(season) = row.season("playoffs") else {
            continue;
        };
        playoffs.push(PlayoffRow {
            season,
            line: PlayoffLine {
                games: row.count("games"),
                wins: row.count("wins"),
                losses: row.count("losses"),
                passing: row.stat_totals(),
            },
            player_id: row.player_id,
        });
    }
    Ok(playoffs)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

fn open(path: &Path) -> Result<std::fs::File, IngestError> {
    std::fs::File::open(path).map_err(|e| IngestError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

fn csv_error(path: &Path) -> impl FnOnce(csv::Error) -> IngestError + '_ {
    move |e| IngestError::Csv {
        path: path.display().to_string(),
        source: e,
    }
}

/// Load regular-season lines from a CSV file.
pub fn load_seasons(path: &Path) -> Result<Vec<SeasonRow>, IngestError> {
    load_seasons_from_reader(open(path)?).map_err(csv_error(path))
}

/// Load situational splits from a CSV file.
pub fn load_splits(path: &Path) -> Result<Vec<SplitRow>, IngestError> {
    load_splits_from_reader(open(path)?).map_err(csv_error(path))
}

/// Load playoff lines from a CSV file.
pub fn load_playoffs(path: &Path) -> Result<Vec<PlayoffRow>, IngestError> {
    load_playoffs_from_reader(open(path)?).map_err(csv_error(path))
}

/// Load all roster data using paths from the config.
pub fn load_all(config: &Config) -> Result<RosterData, IngestError> {
    load_all_from_paths(&config.data_paths)
}

/// Load all roster data from explicit paths. The playoffs file is optional.
pub fn load_all_from_paths(paths: &DataPaths) -> Result<RosterData, IngestError> {
    let seasons = load_seasons(Path::new(&paths.seasons))?;
    let splits = load_splits(Path::new(&paths.splits))?;
    let playoffs = match &paths.playoffs {
        Some(p) => load_playoffs(Path::new(p))?,
        None => Vec::new(),
    };

    if seasons.is_empty() {
        return Err(IngestError::Validation(
            "seasons CSV produced zero valid rows".into(),
        ));
    }

    debug!(
        "loaded {} season rows, {} split rows, {} playoff rows",
        seasons.len(),
        splits.len(),
        playoffs.len()
    );

    Ok(RosterData {
        seasons,
        splits,
        playoffs,
    })
}

// ---------------------------------------------------------------------------
// Profile assembly
// ---------------------------------------------------------------------------

/// One player's merged regular-season rows for one season.
struct MergedSeason<'a> {
    latest: &'a SeasonRow,
    line: SeasonLine,
}

/// Group season rows by player then season. A player listed twice in one
/// season (a mid-season trade) gets the lines summed except for the
/// schedule length, which is shared; the later row supplies the team.
fn merge_seasons(rows: &[SeasonRow]) -> BTreeMap<&str, BTreeMap<u16, MergedSeason<'_>>> {
    let mut players: BTreeMap<&str, BTreeMap<u16, MergedSeason<'_>>> = BTreeMap::new();
    for row in rows {
        let seasons = players.entry(row.player_id.as_str()).or_default();
        match seasons.get_mut(&row.season) {
            Some(merged) => {
                // Both teams played the same schedule length.
                let scheduled = merged.line.scheduled_games.max(row.line.scheduled_games);
                merged.line += &row.line;
                merged.line.scheduled_games = scheduled;
                merged.latest = row;
            }
            None => {
                seasons.insert(
                    row.season,
                    MergedSeason {
                        latest: row,
                        line: row.line,
                    },
                );
            }
        }
    }
    players
}

/// Mean of the ranks present across seasons; `None` when none are.
fn mean_rank<I>(ranks: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let present: Vec<f64> = ranks.into_iter().flatten().collect();
    if present.is_empty() {
        return None;
    }
    Some(present.iter().sum::<f64>() / present.len() as f64)
}

/// Shape raw rows into one profile per player for the given mode.
///
/// Single-season mode yields a profile for every player with a row in that
/// season; career mode yields one per player with any row up to the final
/// season. Only data up to the final season is used. Profiles come out in
/// player_id order.
pub fn build_profiles(data: &RosterData, mode: ScoringMode) -> Vec<PlayerSeasonProfile> {
    let final_season = mode.final_season();
    let players = merge_seasons(&data.seasons);

    let mut splits_by_player: HashMap<&str, Vec<&SplitRow>> = HashMap::new();
    for split in &data.splits {
        splits_by_player.entry(split.player_id.as_str()).or_default().push(split);
    }
    let mut playoffs_by_player: HashMap<&str, Vec<&PlayoffRow>> = HashMap::new();
    for playoff in &data.playoffs {
        playoffs_by_player.entry(playoff.player_id.as_str()).or_default().push(playoff);
    }

    let mut profiles = Vec::new();
    for (player_id, seasons) in &players {
        let window: Vec<(&u16, &MergedSeason)> = seasons.range(..=final_season).collect();
        let Some(&(&latest_season, latest)) = window.last() else {
            continue;
        };

        // Which seasons feed the per-season inputs.
        let scored_season = match mode {
            ScoringMode::SingleSeason { season, .. } => {
                if latest_season != season {
                    continue;
                }
                Some(season)
            }
            ScoringMode::Career { .. } => None,
        };
        let in_scope = |season: u16| match scored_season {
            Some(s) => season == s,
            None => season <= final_season,
        };

        let mut career_line = SeasonLine::default();
        for (_, merged) in &window {
            career_line += &merged.line;
        }

        let season_line = match scored_season {
            Some(_) => latest.line,
            None => career_line,
        };

        let history: Vec<SeasonSummary> = window
            .iter()
            .map(|&(&season, merged)| SeasonSummary {
                season,
                games_started: merged.line.games_started,
                scheduled_games: merged.line.scheduled_games,
            })
            .collect();

        let support = match scored_season {
            Some(_) => latest.latest.support,
            None => SupportContext {
                offensive_line_rank: mean_rank(
                    window.iter().map(|(_, m)| m.latest.support.offensive_line_rank),
                ),
                weapons_rank: mean_rank(window.iter().map(|(_, m)| m.latest.support.weapons_rank)),
                defense_rank: mean_rank(window.iter().map(|(_, m)| m.latest.support.defense_rank)),
            },
        };

        let playoffs = playoffs_by_player.get(player_id).and_then(|rows| {
            let mut total: Option<PlayoffLine> = None;
            for row in rows.iter().filter(|r| in_scope(r.season)) {
                *total.get_or_insert_with(PlayoffLine::default) += &row.line;
            }
            total
        });

        let splits: Vec<SituationalRecord> = splits_by_player
            .get(player_id)
            .map(|rows| {
                rows.iter()
                    .filter(|r| in_scope(r.season))
                    .map(|r| r.record.clone())
                    .collect()
            })
            .unwrap_or_default();

        profiles.push(PlayerSeasonProfile {
            player_id: player_id.to_string(),
            name: latest.latest.name.clone(),
            team: latest.latest.team.clone(),
            season: latest_season,
            age: latest.latest.age,
            season_line,
            career_line,
            history,
            playoffs,
            splits,
            support,
        });
    }

    debug!(
        "built {} profiles for {:?} from {} players",
        profiles.len(),
        mode,
        players.len()
    );
    profiles
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
