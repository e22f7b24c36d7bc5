//! Game record store.
//!
//! The aggregator only reads from here. Records are append-only and kept in
//! ingestion order so a `RecordCursor` (number of records already consumed)
//! identifies everything that arrived after it.

use crate::champions::{ChampionCatalog, ChampionId};
use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

pub const MAX_TEAM_SIZE: usize = 5;
pub const MAX_BANS_PER_SIDE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Blue,
    Red,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Blue => Side::Red,
            Side::Red => Side::Blue,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Blue => f.write_str("blue"),
            Side::Red => f.write_str("red"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub id: String,
    #[serde(alias = "timestamp")]
    pub played_at: DateTime<Utc>,
    pub blue_team: Vec<ChampionId>,
    pub red_team: Vec<ChampionId>,
    #[serde(default)]
    pub blue_bans: Vec<ChampionId>,
    #[serde(default)]
    pub red_bans: Vec<ChampionId>,
    pub winner: Side,
    /// Game length in seconds.
    #[serde(alias = "duration", default)]
    pub duration_secs: u32,
}

impl GameRecord {
    pub fn team(&self, side: Side) -> &[ChampionId] {
        match side {
            Side::Blue => &self.blue_team,
            Side::Red => &self.red_team,
        }
    }

    pub fn bans(&self, side: Side) -> &[ChampionId] {
        match side {
            Side::Blue => &self.blue_bans,
            Side::Red => &self.red_bans,
        }
    }

    pub fn picks(&self) -> impl Iterator<Item = (Side, ChampionId)> + '_ {
        self.blue_team
            .iter()
            .map(|id| (Side::Blue, *id))
            .chain(self.red_team.iter().map(|id| (Side::Red, *id)))
    }

    /// Structural checks: team/ban sizes, no champion picked twice, no
    /// champion both banned and picked.
    pub fn validate(&self) -> Result<(), AppError> {
        for side in [Side::Blue, Side::Red] {
            if self.team(side).len() > MAX_TEAM_SIZE {
                return Err(AppError::invalid(format!(
                    "game {}: {} team has {} champions (max {})",
                    self.id,
                    side,
                    self.team(side).len(),
                    MAX_TEAM_SIZE
                )));
            }
            if self.bans(side).len() > MAX_BANS_PER_SIDE {
                return Err(AppError::invalid(format!(
                    "game {}: {} side has {} bans (max {})",
                    self.id,
                    side,
                    self.bans(side).len(),
                    MAX_BANS_PER_SIDE
                )));
            }
        }

        let mut picked = HashSet::new();
        for (_, id) in self.picks() {
            if !picked.insert(id) {
                return Err(AppError::invalid(format!(
                    "game {}: champion {} picked more than once",
                    self.id, id
                )));
            }
        }

        for id in self.blue_bans.iter().chain(self.red_bans.iter()) {
            if picked.contains(id) {
                return Err(AppError::invalid(format!(
                    "game {}: champion {} is both banned and picked",
                    self.id, id
                )));
            }
        }

        Ok(())
    }

    /// `validate` plus a check that every champion exists in the catalog.
    pub fn validate_against(&self, catalog: &ChampionCatalog) -> Result<(), AppError> {
        self.validate()?;
        for id in self
            .blue_team
            .iter()
            .chain(&self.red_team)
            .chain(&self.blue_bans)
            .chain(&self.red_bans)
        {
            catalog.get(*id).map_err(|_| {
                AppError::invalid(format!("game {}: unknown champion id {}", self.id, id.0))
            })?;
        }
        Ok(())
    }
}

/// Number of records already consumed from a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordCursor(pub u64);

/// Read-only access to finished game records.
pub trait RecordStore: Send + Sync {
    fn all_records(&self) -> Result<Vec<GameRecord>, AppError>;

    /// Records appended after `cursor`, plus the cursor that follows them.
    fn records_since(&self, cursor: RecordCursor)
        -> Result<(Vec<GameRecord>, RecordCursor), AppError>;
}

fn slice_since(
    records: &[GameRecord],
    cursor: RecordCursor,
) -> Result<(Vec<GameRecord>, RecordCursor), AppError> {
    let start = cursor.0 as usize;
    if start > records.len() {
        return Err(AppError::InternalInconsistency(format!(
            "record cursor {} is ahead of the store ({} records)",
            cursor.0,
            records.len()
        )));
    }
    Ok((
        records[start..].to_vec(),
        RecordCursor(records.len() as u64),
    ))
}

/// In-process store, mostly for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<Vec<GameRecord>>,
}

impl MemoryRecordStore {
    pub fn new(records: Vec<GameRecord>) -> Self {
        MemoryRecordStore {
            records: RwLock::new(records),
        }
    }

    pub fn push(&self, record: GameRecord) {
        self.records
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordStore for MemoryRecordStore {
    fn all_records(&self) -> Result<Vec<GameRecord>, AppError> {
        Ok(self.records.read().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn records_since(
        &self,
        cursor: RecordCursor,
    ) -> Result<(Vec<GameRecord>, RecordCursor), AppError> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        slice_since(&records, cursor)
    }
}

/// Records persisted as a JSON array on disk.
#[derive(Debug, Clone)]
pub struct JsonRecordStore {
    path: PathBuf,
}

impl JsonRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonRecordStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<GameRecord>, AppError> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            AppError::DataUnavailable(format!(
                "record store {} is unreadable: {}",
                self.path.display(),
                e
            ))
        })?;

        serde_json::from_str(&content)
            .map_err(|e| AppError::JsonError(format!("Failed to parse game records: {}", e)))
    }

    fn save(&self, records: &[GameRecord]) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| AppError::IoError(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(records).map_err(|e| {
            AppError::JsonError(format!("Failed to serialize game records: {}", e))
        })?;

        // readers only ever see the old file or the complete new one
        let staging = self.staging_path();
        fs::write(&staging, json)
            .map_err(|e| AppError::IoError(format!("Failed to write game records: {}", e)))?;
        fs::rename(&staging, &self.path).map_err(|e| {
            let _ = fs::remove_file(&staging);
            AppError::IoError(format!("Failed to replace game records: {}", e))
        })
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "records.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Appends records whose id is not stored yet. Returns how many were added.
    /// Ingestion lives outside the read-only `RecordStore` contract.
    pub fn append(&self, new_records: Vec<GameRecord>) -> Result<usize, AppError> {
        let mut records = match self.load() {
            Ok(records) => records,
            Err(AppError::DataUnavailable(_)) => Vec::new(),
            Err(e) => return Err(e),
        };

        let mut existing_ids: HashSet<String> = records.iter().map(|r| r.id.clone()).collect();
        let mut added = 0;

        for record in new_records {
            if existing_ids.insert(record.id.clone()) {
                records.push(record);
                added += 1;
            }
        }

        if added > 0 {
            self.save(&records)?;
        }
        Ok(added)
    }
}

impl RecordStore for JsonRecordStore {
    fn all_records(&self) -> Result<Vec<GameRecord>, AppError> {
        self.load()
    }

    fn records_since(
        &self,
        cursor: RecordCursor,
    ) -> Result<(Vec<GameRecord>, RecordCursor), AppError> {
        let records = self.load()?;
        slice_since(&records, cursor)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn game(id: &str, blue: &[u32], red: &[u32], winner: Side) -> GameRecord {
        GameRecord {
            id: id.to_string(),
            played_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            blue_team: blue.iter().map(|i| ChampionId(*i)).collect(),
            red_team: red.iter().map(|i| ChampionId(*i)).collect(),
            blue_bans: Vec::new(),
            red_bans: Vec::new(),
            winner,
            duration_secs: 1800,
        }
    }

    #[test]
    fn test_validate_rejects_oversized_team() {
        let record = game("g1", &[1, 2, 3, 4, 5, 6], &[7], Side::Blue);
        assert!(matches!(record.validate(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_validate_rejects_duplicate_pick() {
        let record = game("g1", &[1, 2], &[2, 3], Side::Red);
        assert!(matches!(record.validate(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_validate_rejects_banned_and_picked() {
        let mut record = game("g1", &[1, 2], &[3, 4], Side::Red);
        record.red_bans = vec![ChampionId(1)];
        assert!(matches!(record.validate(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_records_since_cursor() {
        let store = MemoryRecordStore::new(vec![
            game("g1", &[1], &[2], Side::Blue),
            game("g2", &[1], &[2], Side::Red),
        ]);
        let (records, cursor) = store.records_since(RecordCursor(1)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "g2");
        assert_eq!(cursor, RecordCursor(2));

        store.push(game("g3", &[1], &[2], Side::Blue));
        let (records, cursor) = store.records_since(cursor).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(cursor, RecordCursor(3));
    }

    #[test]
    fn test_cursor_ahead_of_store_is_inconsistent() {
        let store = MemoryRecordStore::default();
        assert!(matches!(
            store.records_since(RecordCursor(4)),
            Err(AppError::InternalInconsistency(_))
        ));
    }

    #[test]
    fn test_missing_file_is_data_unavailable() {
        let store = JsonRecordStore::new(std::env::temp_dir().join("draft_insight_missing_store.json"));
        assert!(matches!(store.all_records(), Err(AppError::DataUnavailable(_))));
    }

    #[test]
    fn test_json_store_append_dedupes_by_id() {
        let path = std::env::temp_dir().join(format!(
            "draft_insight_store_{}.json",
            std::process::id()
        ));
        let _ = fs::remove_file(&path);
        let store = JsonRecordStore::new(&path);

        let added = store
            .append(vec![game("g1", &[1], &[2], Side::Blue), game("g2", &[3], &[4], Side::Red)])
            .unwrap();
        assert_eq!(added, 2);

        let added = store
            .append(vec![game("g2", &[3], &[4], Side::Red), game("g3", &[5], &[6], Side::Blue)])
            .unwrap();
        assert_eq!(added, 1);

        let ids: Vec<String> = store.all_records().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["g1", "g2", "g3"]);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_json_store_replaces_file_whole() {
        let dir = std::env::temp_dir().join(format!("draft_insight_atomic_{}", std::process::id()));
        let path = dir.join("records.json");
        let _ = fs::remove_dir_all(&dir);
        let store = JsonRecordStore::new(&path);

        store.append(vec![game("g1", &[1], &[2], Side::Blue)]).unwrap();
        // leftover from an interrupted write must not affect the next one
        fs::write(store.staging_path(), "{ truncated").unwrap();
        store.append(vec![game("g2", &[3], &[4], Side::Red)]).unwrap();

        assert!(!store.staging_path().exists());
        let ids: Vec<String> = store.all_records().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["g1", "g2"]);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_record_wire_format() {
        let json = r#"{
            "id": "g7",
            "timestamp": "2024-03-01T12:00:00Z",
            "blueTeam": [61, 64],
            "redTeam": [134],
            "winner": "red",
            "duration": 1700
        }"#;
        let record: GameRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.winner, Side::Red);
        assert_eq!(record.duration_secs, 1700);
        assert!(record.blue_bans.is_empty());
    }
}
