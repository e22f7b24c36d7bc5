use crate::analysis::aggregator::StatsAccumulator;
use crate::analysis::champion_stats::ChampionStat;
use crate::analysis::synergy::{MatchupStat, PairCounts};
use crate::error::AppError;
use crate::store::RecordCursor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Aggregated counts persisted between runs, so the next run only has to
/// apply records past `cursor`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsCache {
    pub last_updated: DateTime<Utc>,
    /// Last full recomputation. Incremental refreshes leave it alone, and
    /// caches written without it count as stale.
    #[serde(default)]
    pub rebuilt_at: DateTime<Utc>,
    pub cursor: RecordCursor,
    pub total_games: u32,
    pub champions: Vec<ChampionStat>,
    pub pairs: Vec<PairCounts>,
    pub matchups: Vec<MatchupStat>,
}

impl StatsCache {
    pub fn from_state(
        accumulator: &StatsAccumulator,
        cursor: RecordCursor,
        rebuilt_at: DateTime<Utc>,
    ) -> Self {
        let (total_games, champions, pairs, matchups) = accumulator.to_parts();
        StatsCache {
            last_updated: Utc::now(),
            rebuilt_at,
            cursor,
            total_games,
            champions,
            pairs,
            matchups,
        }
    }

    pub fn into_state(self) -> Result<(StatsAccumulator, RecordCursor), AppError> {
        let accumulator =
            StatsAccumulator::from_parts(self.total_games, self.champions, self.pairs, self.matchups)?;
        Ok((accumulator, self.cursor))
    }

    /// `Ok(None)` when no cache has been written yet.
    pub fn load(path: &Path) -> Result<Option<Self>, AppError> {
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content)
                .map(Some)
                .map_err(|e| AppError::JsonError(format!("Failed to parse stats cache: {}", e))),
            Err(_) => Ok(None),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| AppError::IoError(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            AppError::JsonError(format!("Failed to serialize stats cache: {}", e))
        })?;

        fs::write(path, json)
            .map_err(|e| AppError::IoError(format!("Failed to write stats cache: {}", e)))?;

        Ok(())
    }

    /// Measured from the last full rebuild, not the last write.
    pub fn is_stale(&self, max_age_mins: u64) -> bool {
        let age = Utc::now().signed_duration_since(self.rebuilt_at);
        age.num_minutes() > max_age_mins as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::game;
    use crate::store::Side;
    use chrono::Duration;

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!(
            "draft_insight_cache_{}.json",
            std::process::id()
        ));
        let accumulator = StatsAccumulator::from_records(&[
            game("g1", &[1, 2], &[3, 4], Side::Blue),
            game("g2", &[3, 1], &[2, 4], Side::Red),
        ]);

        StatsCache::from_state(&accumulator, RecordCursor(2), Utc::now())
            .save(&path)
            .unwrap();
        let (restored, cursor) = StatsCache::load(&path).unwrap().unwrap().into_state().unwrap();

        assert_eq!(restored, accumulator);
        assert_eq!(cursor, RecordCursor(2));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_missing_cache_is_none() {
        let path = std::env::temp_dir().join("draft_insight_no_such_cache.json");
        assert!(StatsCache::load(&path).unwrap().is_none());
    }

    #[test]
    fn test_staleness() {
        let mut cache = StatsCache::from_state(&StatsAccumulator::new(), RecordCursor(0), Utc::now());
        assert!(!cache.is_stale(10));
        cache.rebuilt_at = Utc::now() - Duration::minutes(30);
        assert!(cache.is_stale(10));
    }

    #[test]
    fn test_recent_write_does_not_refresh_age() {
        let rebuilt_at = Utc::now() - Duration::minutes(90);
        let cache = StatsCache::from_state(&StatsAccumulator::new(), RecordCursor(0), rebuilt_at);
        assert!(cache.last_updated > rebuilt_at);
        assert!(cache.is_stale(60));
    }

    #[test]
    fn test_cache_without_rebuild_time_is_stale() {
        let json = r#"{"last_updated":"2024-01-01T00:00:00Z","cursor":0,"total_games":0,
            "champions":[],"pairs":[],"matchups":[]}"#;
        let cache: StatsCache = serde_json::from_str(json).unwrap();
        // defaults to the epoch
        assert!(cache.is_stale(60 * 24 * 365 * 10));
    }
}
