use crate::error::AppError;
use std::env;
use std::path::PathBuf;

/// Weights and thresholds used by the scorer and the prediction assembler.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringSettings {
    pub win_rate_weight: f64,
    pub synergy_weight: f64,
    pub counter_weight: f64,
    /// Win rate (percent) assumed for champions without picks.
    pub neutral_win_rate: f64,
    /// Advantage in percentage points needed to call a matchup good or bad.
    pub matchup_threshold: f64,
    pub matchup_min_games: u32,
    pub matchup_limit: usize,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        ScoringSettings {
            win_rate_weight: 1.0,
            synergy_weight: 1.0,
            counter_weight: 0.5,
            neutral_win_rate: 50.0,
            matchup_threshold: 2.0,
            matchup_min_games: 1,
            matchup_limit: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub records_file: PathBuf,
    pub champions_file: PathBuf,
    /// Older caches are discarded and the statistics rebuilt from scratch.
    pub cache_max_age_mins: u64,
    pub scoring: ScoringSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let data_dir = env::var("DRAFT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());

        Self::from_env_with_data_dir(data_dir)
    }

    /// Like `from_env`, but the data directory is fixed (CLI override).
    pub fn from_env_with_data_dir(data_dir: PathBuf) -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let records_file = env::var("DRAFT_RECORDS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("records.json"));
        let champions_file = env::var("DRAFT_CHAMPIONS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("champions.json"));

        let defaults = ScoringSettings::default();
        let scoring = ScoringSettings {
            win_rate_weight: read_var("DRAFT_WEIGHT_WIN_RATE", defaults.win_rate_weight)?,
            synergy_weight: read_var("DRAFT_WEIGHT_SYNERGY", defaults.synergy_weight)?,
            counter_weight: read_var("DRAFT_WEIGHT_COUNTER", defaults.counter_weight)?,
            neutral_win_rate: read_var("DRAFT_NEUTRAL_WIN_RATE", defaults.neutral_win_rate)?,
            matchup_threshold: read_var("DRAFT_MATCHUP_THRESHOLD", defaults.matchup_threshold)?,
            matchup_min_games: read_var("DRAFT_MATCHUP_MIN_GAMES", defaults.matchup_min_games)?,
            matchup_limit: defaults.matchup_limit,
        };

        if !(0.0..=100.0).contains(&scoring.neutral_win_rate) {
            return Err(AppError::ConfigError(format!(
                "DRAFT_NEUTRAL_WIN_RATE must be within 0-100, got {}",
                scoring.neutral_win_rate
            )));
        }

        Ok(Config {
            data_dir,
            records_file,
            champions_file,
            cache_max_age_mins: read_var("DRAFT_CACHE_MAX_AGE_MINS", 24 * 60)?,
            scoring,
        })
    }

    pub fn cache_file(&self) -> PathBuf {
        self.data_dir.join("stats_cache.json")
    }
}

pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".draft_insight")
}

fn read_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|_| {
            AppError::ConfigError(format!("{} has an invalid value: {}", name, raw))
        }),
        Err(_) => Ok(default),
    }
}
