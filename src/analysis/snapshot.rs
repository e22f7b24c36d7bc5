//! Versioned statistics snapshots.
//!
//! A `StatsSnapshot` never changes after it is built. `SnapshotStore` keeps
//! the current one behind an `Arc` and replaces it wholesale on refresh, so
//! a reader holding a snapshot sees either the old or the new statistics,
//! never a mix. Refreshes are serialized by a writer mutex.

use crate::analysis::aggregator::StatsAccumulator;
use crate::analysis::champion_stats::ChampionStat;
use crate::analysis::synergy::{
    BaselineAverage, ChampionPair, Matchup, MatchupStat, PairSynergy, SynergyFormula,
};
use crate::champions::ChampionId;
use crate::error::AppError;
use crate::store::{RecordCursor, RecordStore};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    version: u64,
    cursor: RecordCursor,
    total_games: u32,
    champions: BTreeMap<ChampionId, ChampionStat>,
    pairs: BTreeMap<ChampionPair, PairSynergy>,
    matchups: BTreeMap<Matchup, MatchupStat>,
}

impl StatsSnapshot {
    pub fn empty() -> Self {
        StatsSnapshot {
            version: 0,
            cursor: RecordCursor::default(),
            total_games: 0,
            champions: BTreeMap::new(),
            pairs: BTreeMap::new(),
            matchups: BTreeMap::new(),
        }
    }

    pub fn build(
        version: u64,
        cursor: RecordCursor,
        accumulator: &StatsAccumulator,
        formula: &dyn SynergyFormula,
    ) -> Result<Self, AppError> {
        let pairs = accumulator.pair_synergies(formula).inspect_err(|e| {
            error!(version, error = %e, "refusing to build inconsistent snapshot");
        })?;

        Ok(StatsSnapshot {
            version,
            cursor,
            total_games: accumulator.total_games(),
            champions: accumulator.champion_stats().clone(),
            pairs,
            matchups: accumulator.matchup_stats().clone(),
        })
    }

    /// Snapshot of a record slice with the default formula. Handy for one-off analysis.
    pub fn from_records(records: &[crate::store::GameRecord]) -> Result<Self, AppError> {
        let accumulator = StatsAccumulator::from_records(records);
        Self::build(
            1,
            RecordCursor(records.len() as u64),
            &accumulator,
            &BaselineAverage,
        )
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn cursor(&self) -> RecordCursor {
        self.cursor
    }

    pub fn total_games(&self) -> u32 {
        self.total_games
    }

    pub fn is_empty(&self) -> bool {
        self.total_games == 0
    }

    pub fn champion(&self, id: ChampionId) -> Option<&ChampionStat> {
        self.champions.get(&id)
    }

    pub fn win_rate(&self, id: ChampionId) -> Option<f64> {
        self.champion(id).and_then(|stat| stat.win_rate())
    }

    pub fn champion_stats(&self) -> &BTreeMap<ChampionId, ChampionStat> {
        &self.champions
    }

    pub fn pair_synergies(&self) -> &BTreeMap<ChampionPair, PairSynergy> {
        &self.pairs
    }

    pub fn matchups(&self) -> &BTreeMap<Matchup, MatchupStat> {
        &self.matchups
    }

    /// Symmetric lookup; `Ok(None)` means the two were never on a team together.
    pub fn synergy(&self, a: ChampionId, b: ChampionId) -> Result<Option<&PairSynergy>, AppError> {
        let pair = ChampionPair::new(a, b)?;
        Ok(self.pairs.get(&pair))
    }

    pub fn synergy_score(&self, a: ChampionId, b: ChampionId) -> Option<f64> {
        self.synergy(a, b).ok().flatten().map(|s| s.score)
    }

    pub fn matchup(&self, attacker: ChampionId, defender: ChampionId) -> Option<&MatchupStat> {
        self.matchups.get(&Matchup::new(attacker, defender))
    }

    /// Attacker's win rate when opposed to the defender minus its solo win rate.
    pub fn matchup_advantage(&self, attacker: ChampionId, defender: ChampionId) -> Option<f64> {
        let versus = self.matchup(attacker, defender)?.win_rate()?;
        let solo = self.win_rate(attacker)?;
        Some(versus - solo)
    }

    /// Every recorded matchup where `attacker` is the first champion, ordered by defender id.
    pub fn opponents_of(&self, attacker: ChampionId) -> impl Iterator<Item = &MatchupStat> + '_ {
        let start = Matchup::new(attacker, ChampionId(u32::MIN));
        let end = Matchup::new(attacker, ChampionId(u32::MAX));
        self.matchups.range(start..=end).map(|(_, stat)| stat)
    }
}

struct WriterState {
    accumulator: StatsAccumulator,
    cursor: RecordCursor,
    version: u64,
}

/// Holds the current snapshot and serializes its recomputation.
pub struct SnapshotStore {
    current: RwLock<Arc<StatsSnapshot>>,
    writer: Mutex<WriterState>,
    formula: Box<dyn SynergyFormula>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::with_formula(Box::new(BaselineAverage))
    }

    pub fn with_formula(formula: Box<dyn SynergyFormula>) -> Self {
        SnapshotStore {
            current: RwLock::new(Arc::new(StatsSnapshot::empty())),
            writer: Mutex::new(WriterState {
                accumulator: StatsAccumulator::new(),
                cursor: RecordCursor::default(),
                version: 0,
            }),
            formula,
        }
    }

    /// Seeds the store with previously persisted counts. `formula` must be the
    /// one the rest of the process scores with.
    pub fn restore(
        accumulator: StatsAccumulator,
        cursor: RecordCursor,
        formula: Box<dyn SynergyFormula>,
    ) -> Result<Self, AppError> {
        let store = Self::with_formula(formula);
        let snapshot = StatsSnapshot::build(1, cursor, &accumulator, store.formula.as_ref())?;
        {
            let mut state = store.lock_writer()?;
            state.accumulator = accumulator;
            state.cursor = cursor;
            state.version = 1;
        }
        store.install(snapshot);
        Ok(store)
    }

    /// The current snapshot. Hold on to it for the whole request.
    pub fn snapshot(&self) -> Arc<StatsSnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Copy of the writer's counts and cursor, for persisting.
    pub fn export(&self) -> Result<(StatsAccumulator, RecordCursor), AppError> {
        let state = self.lock_writer()?;
        Ok((state.accumulator.clone(), state.cursor))
    }

    /// Applies records added since the last refresh and swaps in a new snapshot.
    /// Nothing new leaves the current snapshot (and its version) in place.
    pub fn refresh(&self, store: &dyn RecordStore) -> Result<Arc<StatsSnapshot>, AppError> {
        let mut state = self.lock_writer()?;
        let (records, next_cursor) = store.records_since(state.cursor)?;

        if records.is_empty() {
            if state.accumulator.total_games() == 0 {
                warn!("record store is empty, serving neutral defaults");
                return Err(AppError::DataUnavailable(
                    "no game records available".to_string(),
                ));
            }
            return Ok(self.snapshot());
        }

        let mut accumulator = state.accumulator.clone();
        let skipped = accumulator.apply_all(&records);
        let version = state.version + 1;
        let snapshot = StatsSnapshot::build(version, next_cursor, &accumulator, self.formula.as_ref())?;

        info!(
            version,
            applied = records.len() - skipped,
            skipped,
            total_games = accumulator.total_games(),
            "statistics refreshed"
        );

        state.accumulator = accumulator;
        state.cursor = next_cursor;
        state.version = version;
        let installed = self.install(snapshot);

        if installed.is_empty() {
            warn!("no valid game records, serving neutral defaults");
            return Err(AppError::DataUnavailable(
                "no game records available".to_string(),
            ));
        }
        Ok(installed)
    }

    /// Recomputes everything from `all_records`.
    pub fn rebuild(&self, store: &dyn RecordStore) -> Result<Arc<StatsSnapshot>, AppError> {
        let mut state = self.lock_writer()?;
        let records = store.all_records()?;

        let accumulator = StatsAccumulator::from_records(&records);
        let cursor = RecordCursor(records.len() as u64);
        let version = state.version + 1;
        let snapshot = StatsSnapshot::build(version, cursor, &accumulator, self.formula.as_ref())?;

        info!(
            version,
            records = records.len(),
            total_games = accumulator.total_games(),
            "statistics rebuilt"
        );

        state.accumulator = accumulator;
        state.cursor = cursor;
        state.version = version;
        let installed = self.install(snapshot);

        if installed.is_empty() {
            warn!("record store is empty, serving neutral defaults");
            return Err(AppError::DataUnavailable(
                "no game records available".to_string(),
            ));
        }
        Ok(installed)
    }

    fn install(&self, snapshot: StatsSnapshot) -> Arc<StatsSnapshot> {
        let snapshot = Arc::new(snapshot);
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Arc::clone(&snapshot);
        snapshot
    }

    fn lock_writer(&self) -> Result<std::sync::MutexGuard<'_, WriterState>, AppError> {
        self.writer.lock().map_err(|_| {
            AppError::InternalInconsistency("a previous refresh panicked mid-update".to_string())
        })
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::game;
    use crate::store::{MemoryRecordStore, Side};
    use approx::assert_relative_eq;

    #[test]
    fn test_refresh_on_empty_store_is_degraded() {
        let snapshots = SnapshotStore::new();
        let store = MemoryRecordStore::default();
        let result = snapshots.refresh(&store);
        assert!(matches!(result, Err(AppError::DataUnavailable(_))));
        assert!(snapshots.snapshot().is_empty());
        assert_eq!(snapshots.snapshot().win_rate(ChampionId(1)), None);
    }

    #[test]
    fn test_refresh_bumps_version_only_on_new_records() {
        let snapshots = SnapshotStore::new();
        let store = MemoryRecordStore::new(vec![game("g1", &[1, 2], &[3], Side::Blue)]);

        let first = snapshots.refresh(&store).unwrap();
        assert_eq!(first.version(), 1);
        assert_eq!(first.cursor(), RecordCursor(1));

        let again = snapshots.refresh(&store).unwrap();
        assert_eq!(again.version(), 1);

        store.push(game("g2", &[3], &[1], Side::Red));
        let second = snapshots.refresh(&store).unwrap();
        assert_eq!(second.version(), 2);
        assert_eq!(second.total_games(), 2);

        // a reader holding the first snapshot still sees the old numbers
        assert_eq!(first.total_games(), 1);
    }

    #[test]
    fn test_refresh_equals_rebuild() {
        let store = MemoryRecordStore::new(vec![game("g1", &[1, 2], &[3, 4], Side::Blue)]);
        let incremental = SnapshotStore::new();
        incremental.refresh(&store).unwrap();
        store.push(game("g2", &[2, 3], &[1, 4], Side::Red));
        store.push(game("g3", &[4, 1], &[2, 3], Side::Blue));
        let refreshed = incremental.refresh(&store).unwrap();

        let batch = SnapshotStore::new();
        let rebuilt = batch.rebuild(&store).unwrap();

        assert_eq!(refreshed.champion_stats(), rebuilt.champion_stats());
        assert_eq!(refreshed.pair_synergies(), rebuilt.pair_synergies());
        assert_eq!(refreshed.matchups(), rebuilt.matchups());
        assert_eq!(refreshed.cursor(), rebuilt.cursor());
    }

    #[test]
    fn test_only_invalid_records_degrade_both_paths() {
        // duplicate pick, rejected by validation
        let store = MemoryRecordStore::new(vec![game("g1", &[1, 1], &[2], Side::Blue)]);

        let incremental = SnapshotStore::new();
        let refreshed = incremental.refresh(&store);
        assert!(matches!(refreshed, Err(AppError::DataUnavailable(_))));
        assert!(incremental.snapshot().is_empty());
        assert_eq!(incremental.export().unwrap().1, RecordCursor(1));

        let batch = SnapshotStore::new();
        let rebuilt = batch.rebuild(&store);
        assert!(matches!(rebuilt, Err(AppError::DataUnavailable(_))));
        assert!(batch.snapshot().is_empty());
    }

    #[test]
    fn test_restore_keeps_custom_formula() {
        struct TogetherOnly;
        impl SynergyFormula for TogetherOnly {
            fn score(&self, together: f64, _a: f64, _b: f64) -> f64 {
                together
            }
        }

        let records = vec![game("g1", &[1, 2], &[3], Side::Blue)];
        let accumulator = StatsAccumulator::from_records(&records);
        let snapshots =
            SnapshotStore::restore(accumulator, RecordCursor(1), Box::new(TogetherOnly)).unwrap();
        assert_relative_eq!(
            snapshots.snapshot().synergy_score(ChampionId(1), ChampionId(2)).unwrap(),
            100.0
        );

        let store = MemoryRecordStore::new(records);
        store.push(game("g2", &[1, 2], &[3], Side::Red));
        let refreshed = snapshots.refresh(&store).unwrap();
        assert_relative_eq!(refreshed.synergy_score(ChampionId(1), ChampionId(2)).unwrap(), 50.0);
    }

    #[test]
    fn test_matchup_advantage_and_opponents() {
        let snapshot = StatsSnapshot::from_records(&[
            game("g1", &[1], &[2], Side::Blue),
            game("g2", &[1], &[3], Side::Red),
            game("g3", &[1], &[2], Side::Blue),
            game("g4", &[1], &[3], Side::Red),
        ])
        .unwrap();

        // 1 wins 50% overall, 100% into 2, 0% into 3
        assert_relative_eq!(snapshot.matchup_advantage(ChampionId(1), ChampionId(2)).unwrap(), 50.0);
        assert_relative_eq!(snapshot.matchup_advantage(ChampionId(1), ChampionId(3)).unwrap(), -50.0);
        assert_eq!(snapshot.matchup_advantage(ChampionId(2), ChampionId(3)), None);

        let defenders: Vec<u32> = snapshot
            .opponents_of(ChampionId(1))
            .map(|m| m.matchup.defender.0)
            .collect();
        assert_eq!(defenders, vec![2, 3]);
    }

    #[test]
    fn test_restore_from_counts() {
        let records = vec![game("g1", &[1, 2], &[3], Side::Red)];
        let accumulator = StatsAccumulator::from_records(&records);
        let snapshots =
            SnapshotStore::restore(accumulator, RecordCursor(1), Box::new(BaselineAverage)).unwrap();
        assert_eq!(snapshots.snapshot().total_games(), 1);

        let store = MemoryRecordStore::new(records);
        store.push(game("g2", &[1, 2], &[3], Side::Blue));
        let refreshed = snapshots.refresh(&store).unwrap();
        assert_eq!(refreshed.total_games(), 2);
        assert_eq!(refreshed.version(), 2);
    }
}
