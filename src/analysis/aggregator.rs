//! Raw count accumulation over game records.
//!
//! Only integer counts live here, so applying records one at a time and
//! applying them all at once end in the same state. Every rate is derived
//! later, when a snapshot is built.

use crate::analysis::champion_stats::ChampionStat;
use crate::analysis::synergy::{
    ChampionPair, Matchup, MatchupStat, PairCounts, PairSynergy, SynergyFormula,
};
use crate::champions::ChampionId;
use crate::error::AppError;
use crate::store::{GameRecord, Side};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsAccumulator {
    total_games: u32,
    champions: BTreeMap<ChampionId, ChampionStat>,
    pairs: BTreeMap<ChampionPair, PairCounts>,
    matchups: BTreeMap<Matchup, MatchupStat>,
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batch aggregation. Malformed records are skipped with a warning,
    /// exactly as `apply_all` does.
    pub fn from_records(records: &[GameRecord]) -> Self {
        let mut accumulator = Self::new();
        accumulator.apply_all(records);
        accumulator
    }

    /// Applies every valid record and returns how many were skipped.
    pub fn apply_all(&mut self, records: &[GameRecord]) -> usize {
        let mut skipped = 0;
        for record in records {
            if let Err(e) = self.apply(record) {
                warn!(game = %record.id, error = %e, "skipping malformed game record");
                skipped += 1;
            }
        }
        skipped
    }

    /// Folds one finished game into the counts. The record is validated
    /// first; an invalid record leaves the accumulator untouched.
    pub fn apply(&mut self, record: &GameRecord) -> Result<(), AppError> {
        record.validate()?;

        self.total_games += 1;
        let mut seen = BTreeSet::new();

        for (side, id) in record.picks() {
            let stat = self
                .champions
                .entry(id)
                .or_insert_with(|| ChampionStat::new(id));
            stat.picks += 1;
            if record.winner == side {
                stat.wins += 1;
            }
            seen.insert(id);
        }

        let banned: BTreeSet<ChampionId> = record
            .blue_bans
            .iter()
            .chain(record.red_bans.iter())
            .copied()
            .collect();
        for id in banned {
            self.champions
                .entry(id)
                .or_insert_with(|| ChampionStat::new(id))
                .bans += 1;
            seen.insert(id);
        }

        for id in seen {
            if let Some(stat) = self.champions.get_mut(&id) {
                stat.games_seen += 1;
            }
        }

        for side in [Side::Blue, Side::Red] {
            let team = record.team(side);
            let won = record.winner == side;
            for (i, a) in team.iter().enumerate() {
                for b in &team[i + 1..] {
                    let pair = ChampionPair::new(*a, *b)?;
                    let counts = self.pairs.entry(pair).or_insert_with(|| PairCounts::new(pair));
                    counts.games_together += 1;
                    if won {
                        counts.wins_together += 1;
                    }
                }
            }
        }

        let blue_won = record.winner == Side::Blue;
        for blue in &record.blue_team {
            for red in &record.red_team {
                let forward = Matchup::new(*blue, *red);
                self.record_matchup(forward, blue_won);
                self.record_matchup(forward.reversed(), !blue_won);
            }
        }

        Ok(())
    }

    fn record_matchup(&mut self, matchup: Matchup, attacker_won: bool) {
        let stat = self
            .matchups
            .entry(matchup)
            .or_insert_with(|| MatchupStat::new(matchup));
        stat.games += 1;
        if attacker_won {
            stat.wins += 1;
        }
    }

    pub fn total_games(&self) -> u32 {
        self.total_games
    }

    pub fn champion_stats(&self) -> &BTreeMap<ChampionId, ChampionStat> {
        &self.champions
    }

    pub fn matchup_stats(&self) -> &BTreeMap<Matchup, MatchupStat> {
        &self.matchups
    }

    /// Derives scored synergies, checking every pair against its members' counts.
    pub fn pair_synergies(
        &self,
        formula: &dyn SynergyFormula,
    ) -> Result<BTreeMap<ChampionPair, PairSynergy>, AppError> {
        let mut synergies = BTreeMap::new();

        for (key, counts) in &self.pairs {
            if !key.is_canonical() || *key != counts.pair {
                return Err(AppError::InternalInconsistency(format!(
                    "pair ({}, {}) is stored under a non-canonical key",
                    key.low(),
                    key.high()
                )));
            }
            if counts.wins_together > counts.games_together {
                return Err(AppError::InternalInconsistency(format!(
                    "pair ({}, {}) has more wins than games",
                    key.low(),
                    key.high()
                )));
            }

            let (Some(together), Some(a), Some(b)) = (
                counts.win_rate_together(),
                self.member_win_rate(key.low(), counts.games_together),
                self.member_win_rate(key.high(), counts.games_together),
            ) else {
                return Err(AppError::InternalInconsistency(format!(
                    "pair ({}, {}) has no matching solo picks",
                    key.low(),
                    key.high()
                )));
            };

            synergies.insert(
                *key,
                PairSynergy {
                    pair: *key,
                    games_together: counts.games_together,
                    wins_together: counts.wins_together,
                    win_rate_together: together,
                    score: formula.score(together, a, b),
                },
            );
        }

        Ok(synergies)
    }

    fn member_win_rate(&self, id: ChampionId, games_together: u32) -> Option<f64> {
        self.champions
            .get(&id)
            .filter(|stat| stat.picks >= games_together)
            .and_then(|stat| stat.win_rate())
    }

    /// Rebuilds an accumulator from persisted parts. Duplicate or
    /// non-canonical keys mean the file was not written by `to_parts`.
    pub fn from_parts(
        total_games: u32,
        champions: Vec<ChampionStat>,
        pairs: Vec<PairCounts>,
        matchups: Vec<MatchupStat>,
    ) -> Result<Self, AppError> {
        let mut accumulator = Self::new();
        accumulator.total_games = total_games;

        for stat in champions {
            if stat.picks > total_games || stat.wins > stat.picks {
                return Err(AppError::InternalInconsistency(format!(
                    "champion {} has impossible counts",
                    stat.champion
                )));
            }
            let id = stat.champion;
            if accumulator.champions.insert(id, stat).is_some() {
                return Err(AppError::InternalInconsistency(format!(
                    "champion {} is stored twice",
                    id
                )));
            }
        }

        for counts in pairs {
            if !counts.pair.is_canonical() {
                return Err(AppError::InternalInconsistency(format!(
                    "pair ({}, {}) is not normalized",
                    counts.pair.low(),
                    counts.pair.high()
                )));
            }
            let pair = counts.pair;
            if accumulator.pairs.insert(pair, counts).is_some() {
                return Err(AppError::InternalInconsistency(format!(
                    "pair ({}, {}) is stored twice",
                    pair.low(),
                    pair.high()
                )));
            }
        }

        for stat in matchups {
            let matchup = stat.matchup;
            if accumulator.matchups.insert(matchup, stat).is_some() {
                return Err(AppError::InternalInconsistency(format!(
                    "matchup {} vs {} is stored twice",
                    matchup.attacker, matchup.defender
                )));
            }
        }

        Ok(accumulator)
    }

    pub fn to_parts(&self) -> (u32, Vec<ChampionStat>, Vec<PairCounts>, Vec<MatchupStat>) {
        (
            self.total_games,
            self.champions.values().cloned().collect(),
            self.pairs.values().cloned().collect(),
            self.matchups.values().cloned().collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::synergy::BaselineAverage;
    use crate::store::tests::game;

    fn records() -> Vec<GameRecord> {
        vec![
            game("g1", &[1, 2, 3], &[4, 5, 6], Side::Blue),
            game("g2", &[4, 1], &[2, 6], Side::Red),
            game("g3", &[3, 5], &[1, 2], Side::Blue),
            game("g4", &[6, 2, 1], &[3], Side::Red),
        ]
    }

    #[test]
    fn test_incremental_matches_batch() {
        let all = records();
        let batch = StatsAccumulator::from_records(&all);

        for split in 0..=all.len() {
            let mut incremental = StatsAccumulator::from_records(&all[..split]);
            for record in &all[split..] {
                incremental.apply(record).unwrap();
            }
            assert_eq!(incremental, batch, "split at {}", split);
        }
    }

    #[test]
    fn test_invalid_record_is_skipped() {
        let mut accumulator = StatsAccumulator::new();
        let bad = game("bad", &[1, 1], &[2], Side::Blue);
        assert!(accumulator.apply(&bad).is_err());
        assert_eq!(accumulator, StatsAccumulator::new());

        let skipped = accumulator.apply_all(&[bad, game("ok", &[1], &[2], Side::Blue)]);
        assert_eq!(skipped, 1);
        assert_eq!(accumulator.total_games(), 1);
    }

    #[test]
    fn test_parts_round_trip() {
        let accumulator = StatsAccumulator::from_records(&records());
        let (total, champions, pairs, matchups) = accumulator.to_parts();
        let restored = StatsAccumulator::from_parts(total, champions, pairs, matchups).unwrap();
        assert_eq!(restored, accumulator);
    }

    #[test]
    fn test_duplicate_pair_parts_are_inconsistent() {
        let accumulator = StatsAccumulator::from_records(&records());
        let (total, champions, mut pairs, matchups) = accumulator.to_parts();
        pairs.push(pairs[0].clone());
        let result = StatsAccumulator::from_parts(total, champions, pairs, matchups);
        assert!(matches!(result, Err(AppError::InternalInconsistency(_))));
    }

    #[test]
    fn test_non_canonical_pair_from_disk_is_inconsistent() {
        let raw = r#"{"pair":{"low":5,"high":2},"games_together":1,"wins_together":1}"#;
        let counts: PairCounts = serde_json::from_str(raw).unwrap();
        let result = StatsAccumulator::from_parts(1, Vec::new(), vec![counts], Vec::new());
        assert!(matches!(result, Err(AppError::InternalInconsistency(_))));
    }

    #[test]
    fn test_orphan_pair_is_inconsistent() {
        let pair = ChampionPair::new(ChampionId(1), ChampionId(2)).unwrap();
        let counts = PairCounts {
            pair,
            games_together: 3,
            wins_together: 1,
        };
        let accumulator =
            StatsAccumulator::from_parts(3, Vec::new(), vec![counts], Vec::new()).unwrap();
        assert!(matches!(
            accumulator.pair_synergies(&BaselineAverage),
            Err(AppError::InternalInconsistency(_))
        ));
    }
}
