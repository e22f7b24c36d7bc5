use crate::analysis::aggregator::StatsAccumulator;
use crate::champions::ChampionId;
use crate::store::GameRecord;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Per-champion counts. Rates are derived on demand and expressed in percent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChampionStat {
    pub champion: ChampionId,
    pub picks: u32,
    pub bans: u32,
    pub wins: u32,
    /// Games where the champion was picked or banned.
    pub games_seen: u32,
}

impl ChampionStat {
    pub fn new(champion: ChampionId) -> Self {
        ChampionStat {
            champion,
            picks: 0,
            bans: 0,
            wins: 0,
            games_seen: 0,
        }
    }

    /// Denominator is every game considered, regardless of role.
    pub fn pick_rate(&self, total_games: u32) -> f64 {
        if total_games == 0 {
            0.0
        } else {
            (self.picks as f64 / total_games as f64) * 100.0
        }
    }

    pub fn ban_rate(&self, total_games: u32) -> f64 {
        if total_games == 0 {
            0.0
        } else {
            (self.bans as f64 / total_games as f64) * 100.0
        }
    }

    /// `None` when the champion was never picked: "no data" is not "always loses".
    pub fn win_rate(&self) -> Option<f64> {
        if self.picks == 0 {
            None
        } else {
            Some((self.wins as f64 / self.picks as f64) * 100.0)
        }
    }

    pub fn losses(&self) -> u32 {
        self.picks - self.wins
    }
}

pub fn compute_champion_stats(records: &[GameRecord]) -> BTreeMap<ChampionId, ChampionStat> {
    StatsAccumulator::from_records(records).champion_stats().clone()
}

/// Pick rate descending, then raw picks descending, then id ascending.
pub fn compare_by_pick_rate(a: &ChampionStat, b: &ChampionStat, total_games: u32) -> Ordering {
    b.pick_rate(total_games)
        .total_cmp(&a.pick_rate(total_games))
        .then_with(|| b.picks.cmp(&a.picks))
        .then_with(|| a.champion.cmp(&b.champion))
}

pub fn meta_ranking(stats: &BTreeMap<ChampionId, ChampionStat>, total_games: u32) -> Vec<ChampionStat> {
    let mut ranked: Vec<ChampionStat> = stats.values().cloned().collect();
    ranked.sort_by(|a, b| compare_by_pick_rate(a, b, total_games));
    ranked
}
