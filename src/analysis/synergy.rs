//! Pair synergy and head-to-head matchup tables.
//!
//! Pairs are unordered: `ChampionPair::new` is the only way to build one and
//! it always stores the lower id first, so (A, B) and (B, A) share a key.
//! Matchups are ordered (attacker, defender).

use crate::analysis::aggregator::StatsAccumulator;
use crate::champions::ChampionId;
use crate::error::AppError;
use crate::store::GameRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChampionPair {
    low: ChampionId,
    high: ChampionId,
}

impl ChampionPair {
    pub fn new(a: ChampionId, b: ChampionId) -> Result<Self, AppError> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Ok(ChampionPair { low: a, high: b }),
            std::cmp::Ordering::Greater => Ok(ChampionPair { low: b, high: a }),
            std::cmp::Ordering::Equal => Err(AppError::invalid(format!(
                "a pair needs two different champions, got {} twice",
                a
            ))),
        }
    }

    pub fn low(&self) -> ChampionId {
        self.low
    }

    pub fn high(&self) -> ChampionId {
        self.high
    }

    /// False only for keys that bypassed `new`, e.g. a hand-edited cache file.
    pub fn is_canonical(&self) -> bool {
        self.low < self.high
    }

    /// The other member of the pair, or `None` when `id` is not in it.
    pub fn partner(&self, id: ChampionId) -> Option<ChampionId> {
        if self.low == id {
            Some(self.high)
        } else if self.high == id {
            Some(self.low)
        } else {
            None
        }
    }
}

/// Raw counts for champions drafted on the same team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairCounts {
    pub pair: ChampionPair,
    pub games_together: u32,
    pub wins_together: u32,
}

impl PairCounts {
    pub fn new(pair: ChampionPair) -> Self {
        PairCounts {
            pair,
            games_together: 0,
            wins_together: 0,
        }
    }

    pub fn win_rate_together(&self) -> Option<f64> {
        if self.games_together == 0 {
            None
        } else {
            Some((self.wins_together as f64 / self.games_together as f64) * 100.0)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairSynergy {
    pub pair: ChampionPair,
    pub games_together: u32,
    pub wins_together: u32,
    /// Percent.
    pub win_rate_together: f64,
    /// Percentage points above the members' average solo win rate.
    pub score: f64,
}

/// How a pair's synergy score is derived from its win rates (all in percent).
pub trait SynergyFormula: Send + Sync {
    fn score(&self, win_rate_together: f64, win_rate_a: f64, win_rate_b: f64) -> f64;
}

/// `together - (a + b) / 2`
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineAverage;

impl SynergyFormula for BaselineAverage {
    fn score(&self, win_rate_together: f64, win_rate_a: f64, win_rate_b: f64) -> f64 {
        win_rate_together - ((win_rate_a + win_rate_b) / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Matchup {
    pub attacker: ChampionId,
    pub defender: ChampionId,
}

impl Matchup {
    pub fn new(attacker: ChampionId, defender: ChampionId) -> Self {
        Matchup { attacker, defender }
    }

    pub fn reversed(&self) -> Matchup {
        Matchup::new(self.defender, self.attacker)
    }
}

/// Games where `attacker` was drafted against `defender`, and the attacker's wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchupStat {
    pub matchup: Matchup,
    pub games: u32,
    pub wins: u32,
}

impl MatchupStat {
    pub fn new(matchup: Matchup) -> Self {
        MatchupStat {
            matchup,
            games: 0,
            wins: 0,
        }
    }

    pub fn win_rate(&self) -> Option<f64> {
        if self.games == 0 {
            None
        } else {
            Some((self.wins as f64 / self.games as f64) * 100.0)
        }
    }
}

pub fn compute_pair_synergy(
    records: &[GameRecord],
) -> Result<BTreeMap<ChampionPair, PairSynergy>, AppError> {
    compute_pair_synergy_with(records, &BaselineAverage)
}

pub fn compute_pair_synergy_with(
    records: &[GameRecord],
    formula: &dyn SynergyFormula,
) -> Result<BTreeMap<ChampionPair, PairSynergy>, AppError> {
    StatsAccumulator::from_records(records).pair_synergies(formula)
}

pub fn compute_matchups(records: &[GameRecord]) -> BTreeMap<Matchup, MatchupStat> {
    StatsAccumulator::from_records(records).matchup_stats().clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::game;
    use crate::store::Side;
    use approx::assert_relative_eq;

    #[test]
    fn test_pair_is_normalized() {
        let ab = ChampionPair::new(ChampionId(9), ChampionId(2)).unwrap();
        let ba = ChampionPair::new(ChampionId(2), ChampionId(9)).unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.low(), ChampionId(2));
        assert!(ab.is_canonical());
        assert_eq!(ab.partner(ChampionId(9)), Some(ChampionId(2)));
        assert_eq!(ab.partner(ChampionId(2)), Some(ChampionId(9)));
        assert_eq!(ab.partner(ChampionId(5)), None);
    }

    #[test]
    fn test_pair_of_same_champion_rejected() {
        assert!(matches!(
            ChampionPair::new(ChampionId(4), ChampionId(4)),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_baseline_average_formula() {
        assert_relative_eq!(BaselineAverage.score(80.0, 50.0, 50.0), 30.0);
        assert_relative_eq!(BaselineAverage.score(40.0, 60.0, 40.0), -10.0);
    }

    #[test]
    fn test_pair_synergy_counts() {
        let records = vec![
            game("g1", &[1, 2, 3], &[4, 5], Side::Blue),
            game("g2", &[2, 1], &[3, 4], Side::Red),
        ];
        let synergy = compute_pair_synergy(&records).unwrap();
        let pair = ChampionPair::new(ChampionId(1), ChampionId(2)).unwrap();
        let entry = &synergy[&pair];
        assert_eq!(entry.games_together, 2);
        assert_eq!(entry.wins_together, 1);
        assert_relative_eq!(entry.win_rate_together, 50.0);
        // both members are 1-1 solo as well
        assert_relative_eq!(entry.score, 0.0);
    }

    #[test]
    fn test_matchups_are_ordered() {
        let records = vec![
            game("g1", &[1], &[2], Side::Blue),
            game("g2", &[2], &[1], Side::Blue),
            game("g3", &[1], &[2], Side::Blue),
        ];
        let matchups = compute_matchups(&records);
        let one_vs_two = &matchups[&Matchup::new(ChampionId(1), ChampionId(2))];
        let two_vs_one = &matchups[&Matchup::new(ChampionId(2), ChampionId(1))];
        assert_eq!(one_vs_two.games, 3);
        assert_eq!(one_vs_two.wins, 2);
        assert_eq!(two_vs_one.wins, 1);
    }

    struct Together;

    impl SynergyFormula for Together {
        fn score(&self, win_rate_together: f64, _: f64, _: f64) -> f64 {
            win_rate_together
        }
    }

    #[test]
    fn test_custom_formula() {
        let records = vec![game("g1", &[1, 2], &[3], Side::Blue)];
        let synergy = compute_pair_synergy_with(&records, &Together).unwrap();
        let pair = ChampionPair::new(ChampionId(1), ChampionId(2)).unwrap();
        assert_relative_eq!(synergy[&pair].score, 100.0);
    }
}
