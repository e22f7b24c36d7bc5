//! Per-request draft state and the tournament pick/ban order.

use crate::champions::{ChampionCatalog, ChampionId};
use crate::error::AppError;
use crate::store::{Side, MAX_BANS_PER_SIDE, MAX_TEAM_SIZE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Pick,
    Ban,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Pick => f.write_str("pick"),
            Phase::Ban => f.write_str("ban"),
        }
    }
}

/// Standard tournament draft: three bans each, six picks, two bans each, four picks.
pub const DRAFT_ORDER: [(Phase, Side); 20] = [
    (Phase::Ban, Side::Blue),
    (Phase::Ban, Side::Red),
    (Phase::Ban, Side::Blue),
    (Phase::Ban, Side::Red),
    (Phase::Ban, Side::Blue),
    (Phase::Ban, Side::Red),
    (Phase::Pick, Side::Blue),
    (Phase::Pick, Side::Red),
    (Phase::Pick, Side::Red),
    (Phase::Pick, Side::Blue),
    (Phase::Pick, Side::Blue),
    (Phase::Pick, Side::Red),
    (Phase::Ban, Side::Red),
    (Phase::Ban, Side::Blue),
    (Phase::Ban, Side::Red),
    (Phase::Ban, Side::Blue),
    (Phase::Pick, Side::Red),
    (Phase::Pick, Side::Blue),
    (Phase::Pick, Side::Blue),
    (Phase::Pick, Side::Red),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftStep {
    pub action: Phase,
    pub side: Side,
    /// Zero-based position in `DRAFT_ORDER`.
    pub index: usize,
    /// 1: first bans, 2: first picks, 3: second bans, 4: second picks.
    pub round: u8,
}

fn round_of(index: usize) -> u8 {
    match index {
        0..=5 => 1,
        6..=11 => 2,
        12..=15 => 3,
        _ => 4,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DraftContext {
    pub blue_picks: Vec<ChampionId>,
    pub red_picks: Vec<ChampionId>,
    pub blue_bans: Vec<ChampionId>,
    pub red_bans: Vec<ChampionId>,
    pub phase: Phase,
    /// Side to act. Derived from the draft order when absent.
    pub turn: Option<Side>,
}

impl DraftContext {
    pub fn new(phase: Phase) -> Self {
        DraftContext {
            blue_picks: Vec::new(),
            red_picks: Vec::new(),
            blue_bans: Vec::new(),
            red_bans: Vec::new(),
            phase,
            turn: None,
        }
    }

    pub fn picks(&self, side: Side) -> &[ChampionId] {
        match side {
            Side::Blue => &self.blue_picks,
            Side::Red => &self.red_picks,
        }
    }

    pub fn bans(&self, side: Side) -> &[ChampionId] {
        match side {
            Side::Blue => &self.blue_bans,
            Side::Red => &self.red_bans,
        }
    }

    fn all_ids(&self) -> impl Iterator<Item = ChampionId> + '_ {
        self.blue_picks
            .iter()
            .chain(&self.red_picks)
            .chain(&self.blue_bans)
            .chain(&self.red_bans)
            .copied()
    }

    /// Every champion already picked or banned by either side.
    pub fn unavailable(&self) -> BTreeSet<ChampionId> {
        self.all_ids().collect()
    }

    pub fn validate(&self, catalog: &ChampionCatalog) -> Result<(), AppError> {
        for side in [Side::Blue, Side::Red] {
            if self.picks(side).len() > MAX_TEAM_SIZE {
                return Err(AppError::invalid(format!(
                    "{} team has {} picks (max {})",
                    side,
                    self.picks(side).len(),
                    MAX_TEAM_SIZE
                )));
            }
            if self.bans(side).len() > MAX_BANS_PER_SIDE {
                return Err(AppError::invalid(format!(
                    "{} side has {} bans (max {})",
                    side,
                    self.bans(side).len(),
                    MAX_BANS_PER_SIDE
                )));
            }
        }

        let mut seen = BTreeSet::new();
        for id in self.all_ids() {
            catalog.get(id)?;
            if !seen.insert(id) {
                return Err(AppError::invalid(format!(
                    "champion {} appears more than once in the draft",
                    catalog.name_of(id)?
                )));
            }
        }

        Ok(())
    }

    /// Next step of `DRAFT_ORDER` given how many picks and bans each side has
    /// made. `None` once the order is exhausted.
    pub fn next_step(&self) -> Option<DraftStep> {
        let mut used = [[0usize; 2]; 2];

        for (index, (action, side)) in DRAFT_ORDER.iter().enumerate() {
            let made = match action {
                Phase::Pick => self.picks(*side).len(),
                Phase::Ban => self.bans(*side).len(),
            };
            let slot = &mut used[*action as usize][*side as usize];
            if *slot < made {
                *slot += 1;
                continue;
            }
            return Some(DraftStep {
                action: *action,
                side: *side,
                index,
                round: round_of(index),
            });
        }

        None
    }

    pub fn is_complete(&self) -> bool {
        self.next_step().is_none()
    }

    pub fn acting_side(&self) -> Side {
        self.turn
            .or_else(|| self.next_step().map(|step| step.side))
            .unwrap_or(Side::Blue)
    }

    /// Team whose composition candidates are scored for: the acting side
    /// when picking, the opponent when banning.
    pub fn ranking_side(&self) -> Side {
        match self.phase {
            Phase::Pick => self.acting_side(),
            Phase::Ban => self.acting_side().opponent(),
        }
    }

    pub fn allies(&self) -> &[ChampionId] {
        self.picks(self.ranking_side())
    }

    pub fn enemies(&self) -> &[ChampionId] {
        self.picks(self.ranking_side().opponent())
    }
}
