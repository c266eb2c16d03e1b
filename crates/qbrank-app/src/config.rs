// Configuration loading and parsing (config/scoring.toml).

use qbrank_core::composer::ScoringOptions;
use qbrank_core::eligibility::{EligibilityThresholds, ScoringMode, SeasonStatus};
use qbrank_core::population::DEFAULT_MIN_ATTEMPTS;
use qbrank_core::weights::{WeightNode, WeightTree};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub season: SeasonConfig,
    pub scoring: ScoringConfig,
    pub eligibility: EligibilityThresholds,
    pub weights: WeightTree,
    pub data_paths: DataPaths,
    pub cache: CacheConfig,
}

impl Config {
    pub fn mode(&self) -> ScoringMode {
        match self.season.mode {
            ModeKind::SingleSeason => ScoringMode::SingleSeason {
                season: self.season.year,
                status: self.season.status,
            },
            ModeKind::Career => ScoringMode::Career {
                through_season: self.season.year,
            },
        }
    }

    pub fn scoring_options(&self) -> ScoringOptions {
        ScoringOptions {
            mode: self.mode(),
            include_playoffs: self.scoring.include_playoffs,
            thresholds: self.eligibility,
            min_category_attempts: self.scoring.min_category_attempts,
        }
    }
}

// ---------------------------------------------------------------------------
// scoring.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire scoring.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ScoringFile {
    season: SeasonConfig,
    #[serde(default)]
    scoring: ScoringConfig,
    #[serde(default)]
    eligibility: EligibilityThresholds,
    #[serde(default)]
    weights: Option<WeightNode>,
    data_paths: DataPaths,
    #[serde(default)]
    cache: CacheConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    SingleSeason,
    Career,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeasonConfig {
    pub year: u16,
    pub status: SeasonStatus,
    pub mode: ModeKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub include_playoffs: bool,
    pub min_category_attempts: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            include_playoffs: true,
            min_category_attempts: DEFAULT_MIN_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub seasons: String,
    pub splits: String,
    pub playoffs: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_minutes: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig { ttl_minutes: 60 }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/scoring.toml` relative to
/// the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join("scoring.toml");
    let text = read_file(&path)?;
    parse_config(&text).map_err(|e| match e {
        ParseFailure::Toml(source) => ConfigError::ParseError { path, source },
        ParseFailure::Invalid(err) => err,
    })
}

enum ParseFailure {
    Toml(toml::de::Error),
    Invalid(ConfigError),
}

fn parse_config(text: &str) -> Result<Config, ParseFailure> {
    let file: ScoringFile = toml::from_str(text).map_err(ParseFailure::Toml)?;

    // A missing [weights] table means the schema defaults.
    let weights = match &file.weights {
        Some(node) => WeightTree::from_node(node).map_err(|e| {
            ParseFailure::Invalid(ConfigError::ValidationError {
                field: "weights".into(),
                message: e.to_string(),
            })
        })?,
        None => WeightTree::default(),
    };

    let config = Config {
        season: file.season,
        scoring: file.scoring,
        eligibility: file.eligibility,
        weights,
        data_paths: file.data_paths,
        cache: file.cache,
    };

    validate(&config).map_err(ParseFailure::Invalid)?;
    Ok(config)
}

/// Seed `config/scoring.toml` from `defaults/scoring.toml` when the user has
/// none yet. Returns the written path, or `None` when a user file already
/// exists (it is never overwritten).
pub fn ensure_scoring_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join("scoring.toml");
    if target.is_file() {
        return Ok(None);
    }
    let source = base_dir.join("defaults").join("scoring.toml");
    let copy_err = |what: &str, path: &Path, e: std::io::Error| ConfigError::DefaultsCopyError {
        message: format!("{what} {}: {e}", path.display()),
    };

    let mut defaults = std::fs::File::open(&source).map_err(|e| copy_err("cannot open", &source, e))?;
    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir).map_err(|e| copy_err("cannot create", dir, e))?;
    }
    // create_new so a file written concurrently is left alone.
    let mut dest = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&target)
        .map_err(|e| copy_err("cannot create", &target, e))?;
    std::io::copy(&mut defaults, &mut dest).map_err(|e| copy_err("cannot write", &target, e))?;
    tracing::info!("seeded {} from defaults", target.display());
    Ok(Some(target))
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Seeds `config/scoring.toml` from defaults before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_scoring_file(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.season.year == 0 {
        return Err(ConfigError::ValidationError {
            field: "season.year".into(),
            message: "must be greater than 0".into(),
        });
    }

    let min = config.scoring.min_category_attempts;
    if !min.is_finite() || min < 0.0 {
        return Err(ConfigError::ValidationError {
            field: "scoring.min_category_attempts".into(),
            message: format!("must be a non-negative number, got {min}"),
        });
    }

    let e = &config.eligibility;
    let thresholds: &[(&str, u32)] = &[
        ("eligibility.completed_min_starts", e.completed_min_starts),
        ("eligibility.in_progress_min_starts", e.in_progress_min_starts),
        ("eligibility.career_min_starts", e.career_min_starts),
    ];
    for (name, val) in thresholds {
        if *val == 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must be > 0".into(),
            });
        }
    }
    if e.recency_window == 0 {
        return Err(ConfigError::ValidationError {
            field: "eligibility.recency_window".into(),
            message: "must be > 0".into(),
        });
    }

    if config.cache.ttl_minutes <= 0 {
        return Err(ConfigError::ValidationError {
            field: "cache.ttl_minutes".into(),
            message: format!("must be > 0, got {}", config.cache.ttl_minutes),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Crate root, which holds `defaults/`.
    fn project_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    }

    /// Fresh temp dir with `config/scoring.toml` containing `contents`.
    fn temp_config(name: &str, contents: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config/scoring.toml"), contents).unwrap();
        tmp
    }

    const MINIMAL: &str = r#"
[season]
year = 2023
status = "completed"
mode = "single_season"

[data_paths]
seasons = "data/seasons.csv"
splits = "data/splits.csv"
"#;

    #[test]
    fn load_defaults_shipped_with_crate() {
        let tmp = std::env::temp_dir().join("qbrank_config_defaults");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::copy(
            project_root().join("defaults/scoring.toml"),
            tmp.join("defaults/scoring.toml"),
        )
        .unwrap();

        let copied = ensure_scoring_file(&tmp).expect("should copy defaults");
        assert_eq!(copied, Some(tmp.join("config/scoring.toml")));
        let config = load_config_from(&tmp).expect("defaults should load");

        assert_eq!(config.season.mode, ModeKind::SingleSeason);
        assert!(config.scoring.include_playoffs);
        assert!((config.scoring.min_category_attempts - 10.0).abs() < f64::EPSILON);
        assert_eq!(config.eligibility, EligibilityThresholds::default());
        assert_eq!(config.weights, WeightTree::default());
        assert_eq!(config.data_paths.seasons, "data/seasons.csv");
        assert_eq!(config.cache.ttl_minutes, 60);

        // A second pass copies nothing.
        assert_eq!(ensure_scoring_file(&tmp).unwrap(), None);
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn minimal_file_uses_defaults() {
        let tmp = temp_config("qbrank_config_minimal", MINIMAL);
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.weights, WeightTree::default());
        assert!(config.data_paths.playoffs.is_none());
        assert_eq!(
            config.mode(),
            ScoringMode::SingleSeason {
                season: 2023,
                status: SeasonStatus::Completed
            }
        );
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn career_mode_maps_year_to_through_season() {
        let text = MINIMAL.replace("single_season", "career");
        let tmp = temp_config("qbrank_config_career", &text);
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.mode(), ScoringMode::Career { through_season: 2023 });
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn nested_weights_table_is_validated() {
        let text = format!(
            "{MINIMAL}\n[weights]\nteam = 20\n\n[weights.stats]\nweight = 50\nvolume = 0\n\n[weights.stats.efficiency]\nany_a = 70\ntd_rate = 30\n"
        );
        let tmp = temp_config("qbrank_config_weights", &text);
        let config = load_config_from(&tmp).unwrap();
        let stats = config.weights.component("stats").unwrap();
        assert!((stats.weight - 50.0).abs() < f64::EPSILON);
        assert!((config.weights.component("clutch").unwrap().weight).abs() < f64::EPSILON);
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn unknown_weight_key_is_a_validation_error() {
        let text = format!("{MINIMAL}\n[weights]\nteam = 20\nhype = 80\n");
        let tmp = temp_config("qbrank_config_bad_weights", &text);
        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ValidationError { field, message } => {
                assert_eq!(field, "weights");
                assert!(message.contains("hype"));
            }
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_ttl() {
        let text = format!("{MINIMAL}\n[cache]\nttl_minutes = 0\n");
        let tmp = temp_config("qbrank_config_ttl", &text);
        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "cache.ttl_minutes"),
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_completed_threshold() {
        let text = format!("{MINIMAL}\n[eligibility]\ncompleted_min_starts = 0\n");
        let tmp = temp_config("qbrank_config_threshold", &text);
        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "eligibility.completed_min_starts")
            }
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        let tmp = temp_config("qbrank_config_bad_toml", "[season\nyear = ");
        assert!(matches!(
            load_config_from(&tmp).unwrap_err(),
            ConfigError::ParseError { .. }
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_file_is_reported() {
        let tmp = std::env::temp_dir().join("qbrank_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        assert!(matches!(
            load_config_from(&tmp).unwrap_err(),
            ConfigError::FileNotFound { .. }
        ));
    }

    #[test]
    fn seeding_without_defaults_fails() {
        let tmp = std::env::temp_dir().join("qbrank_config_no_dirs");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        assert!(matches!(
            ensure_scoring_file(&tmp).unwrap_err(),
            ConfigError::DefaultsCopyError { .. }
        ));
        assert!(!tmp.join("config").exists());
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn seeding_keeps_existing_user_file() {
        let tmp = temp_config("qbrank_config_user_wins", MINIMAL);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::write(tmp.join("defaults/scoring.toml"), "not toml [").unwrap();

        assert_eq!(ensure_scoring_file(&tmp).unwrap(), None);
        let kept = fs::read_to_string(tmp.join("config/scoring.toml")).unwrap();
        assert_eq!(kept, MINIMAL);
        assert!(load_config_from(&tmp).is_ok());
        let _ = fs::remove_dir_all(&tmp);
    }
}
