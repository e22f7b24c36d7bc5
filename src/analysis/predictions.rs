//! Turns ranked candidates into explained predictions.
//!
//! `confidence` is a min-max normalisation of the score across the whole
//! ranked pool: 100 is the best candidate in this draft, 0 the worst. It is
//! a relative ranking signal, not a calibrated probability of winning.

use crate::analysis::scorer::{RankedCandidate, ScoreBreakdown};
use crate::analysis::snapshot::StatsSnapshot;
use crate::champions::{ChampionCatalog, ChampionId, Role};
use crate::config::ScoringSettings;
use crate::draft::DraftContext;
use crate::error::AppError;
use crate::store::Side;
use std::collections::BTreeSet;

/// Which weighted term moved the score furthest from the neutral baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreDriver {
    WinRate,
    Synergy,
    Counter,
    /// Every term sits at its neutral value.
    Neutral,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchupBreakdown {
    pub good: Vec<String>,
    pub bad: Vec<String>,
    pub neutral: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub champion: ChampionId,
    pub name: String,
    pub role: Role,
    /// 0-100, relative to the ranked pool.
    pub confidence: f64,
    pub score: f64,
    pub win_rate: Option<f64>,
    pub synergy: f64,
    pub driver: ScoreDriver,
    pub reasoning: String,
    pub matchups: MatchupBreakdown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameAnalysis {
    pub blue_team_strength: f64,
    pub red_team_strength: f64,
    pub recommended_role: Option<Role>,
}

pub struct PredictionAssembler<'a> {
    catalog: &'a ChampionCatalog,
    snapshot: &'a StatsSnapshot,
    settings: &'a ScoringSettings,
    context: &'a DraftContext,
}

impl<'a> PredictionAssembler<'a> {
    pub fn new(
        catalog: &'a ChampionCatalog,
        snapshot: &'a StatsSnapshot,
        settings: &'a ScoringSettings,
        context: &'a DraftContext,
    ) -> Self {
        PredictionAssembler {
            catalog,
            snapshot,
            settings,
            context,
        }
    }

    /// The first `top_n` candidates as predictions. A pool smaller than
    /// `top_n` yields the whole pool; `top_n == 0` is rejected.
    pub fn build(&self, ranked: &[RankedCandidate], top_n: usize) -> Result<Vec<Prediction>, AppError> {
        if top_n == 0 {
            return Err(AppError::invalid("top_n must be at least 1"));
        }

        let (min, max) = ranked.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
            (lo.min(c.score), hi.max(c.score))
        });

        ranked
            .iter()
            .take(top_n)
            .map(|candidate| {
                let champion = self.catalog.get(candidate.champion)?;
                let driver = self.driver(&candidate.breakdown);
                Ok(Prediction {
                    champion: candidate.champion,
                    name: champion.name.clone(),
                    role: champion.role,
                    confidence: normalize(candidate.score, min, max),
                    score: candidate.score,
                    win_rate: candidate.breakdown.win_rate,
                    synergy: candidate.breakdown.synergy,
                    driver,
                    reasoning: self.reasoning(candidate, driver)?,
                    matchups: self.matchups(candidate.champion)?,
                })
            })
            .collect()
    }

    pub fn driver(&self, breakdown: &ScoreBreakdown) -> ScoreDriver {
        let contributions = [
            (
                ScoreDriver::WinRate,
                self.settings.win_rate_weight
                    * (breakdown.win_rate_term - self.settings.neutral_win_rate),
            ),
            (ScoreDriver::Synergy, self.settings.synergy_weight * breakdown.synergy),
            (ScoreDriver::Counter, self.settings.counter_weight * breakdown.counter),
        ];

        let mut driver = ScoreDriver::Neutral;
        let mut strongest = 0.0;
        for (candidate, value) in contributions {
            if value.abs() > strongest {
                strongest = value.abs();
                driver = candidate;
            }
        }
        driver
    }

    fn reasoning(&self, candidate: &RankedCandidate, driver: ScoreDriver) -> Result<String, AppError> {
        let breakdown = &candidate.breakdown;
        let neutral = self.settings.neutral_win_rate;

        let text = match driver {
            ScoreDriver::WinRate => {
                let win_rate = breakdown.win_rate_term;
                if win_rate >= neutral {
                    let picks = self
                        .snapshot
                        .champion(candidate.champion)
                        .map(|s| s.picks)
                        .unwrap_or(0);
                    format!(
                        "Strong meta pick with a {:.1}% win rate over {} games.",
                        win_rate, picks
                    )
                } else {
                    format!(
                        "Below-average {:.1}% win rate; ranked for lack of stronger options.",
                        win_rate
                    )
                }
            }
            ScoreDriver::Synergy => match breakdown.best_ally {
                Some(ally) if breakdown.synergy > 0.0 => format!(
                    "Strong synergy with {} ({:+.1} pts over solo win rates).",
                    self.catalog.name_of(ally)?,
                    breakdown.synergy
                ),
                _ => format!(
                    "Poor synergy with the current team composition ({:+.1} pts).",
                    breakdown.synergy
                ),
            },
            ScoreDriver::Counter => match breakdown.best_matchup {
                Some(enemy) if breakdown.counter > 0.0 => format!(
                    "Favorable matchup into {} ({:+.1} pts when opposed).",
                    self.catalog.name_of(enemy)?,
                    breakdown.counter
                ),
                _ => format!(
                    "Difficult matchups against the enemy team ({:+.1} pts when opposed).",
                    breakdown.counter
                ),
            },
            ScoreDriver::Neutral => match breakdown.win_rate {
                Some(win_rate) => format!(
                    "Balanced pick: {:.1}% win rate with no strong synergy or counter signal.",
                    win_rate
                ),
                None => "No historical data yet; ranked on neutral defaults.".to_string(),
            },
        };

        Ok(text)
    }

    /// Good/bad/neutral opponents for `champion`. Uses the enemy picks when
    /// there are any, otherwise every recorded opponent.
    pub fn matchups(&self, champion: ChampionId) -> Result<MatchupBreakdown, AppError> {
        let mut scored: Vec<(ChampionId, Option<f64>)> = Vec::new();
        let enemies = self.context.enemies();

        if enemies.is_empty() {
            for stat in self.snapshot.opponents_of(champion) {
                if stat.games < self.settings.matchup_min_games {
                    continue;
                }
                let defender = stat.matchup.defender;
                if !self.catalog.contains(defender) {
                    continue;
                }
                scored.push((defender, self.snapshot.matchup_advantage(champion, defender)));
            }
        } else {
            for enemy in enemies {
                let advantage = self
                    .snapshot
                    .matchup(champion, *enemy)
                    .filter(|stat| stat.games >= self.settings.matchup_min_games)
                    .and_then(|_| self.snapshot.matchup_advantage(champion, *enemy));
                scored.push((*enemy, advantage));
            }
        }

        let threshold = self.settings.matchup_threshold;
        let mut good = Vec::new();
        let mut bad = Vec::new();
        let mut neutral = Vec::new();

        for (id, advantage) in scored {
            match advantage {
                Some(value) if value >= threshold => good.push((id, value)),
                Some(value) if value <= -threshold => bad.push((id, value)),
                other => neutral.push((id, other.unwrap_or(0.0))),
            }
        }

        good.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        bad.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        neutral.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()).then_with(|| a.0.cmp(&b.0)));

        Ok(MatchupBreakdown {
            good: self.names(&good)?,
            bad: self.names(&bad)?,
            neutral: self.names(&neutral)?,
        })
    }

    fn names(&self, entries: &[(ChampionId, f64)]) -> Result<Vec<String>, AppError> {
        entries
            .iter()
            .take(self.settings.matchup_limit)
            .map(|(id, _)| self.catalog.name_of(*id).map(str::to_string))
            .collect()
    }

    pub fn analyze_game(&self) -> Result<GameAnalysis, AppError> {
        let side = self.context.acting_side();
        let covered: BTreeSet<Role> = self
            .context
            .picks(side)
            .iter()
            .map(|id| self.catalog.role_of(*id))
            .collect::<Result<_, _>>()?;

        Ok(GameAnalysis {
            blue_team_strength: self.team_strength(self.context.picks(Side::Blue)),
            red_team_strength: self.team_strength(self.context.picks(Side::Red)),
            recommended_role: Role::ALL.into_iter().find(|role| !covered.contains(role)),
        })
    }

    /// Mean win rate of the picks plus their mean pair synergy, clamped to 0-100.
    pub fn team_strength(&self, team: &[ChampionId]) -> f64 {
        let neutral = self.settings.neutral_win_rate;
        if team.is_empty() {
            return neutral;
        }

        let win_rate = team
            .iter()
            .map(|id| self.snapshot.win_rate(*id).unwrap_or(neutral))
            .sum::<f64>()
            / team.len() as f64;

        let mut synergy_total = 0.0;
        let mut pairs = 0;
        for (i, a) in team.iter().enumerate() {
            for b in &team[i + 1..] {
                synergy_total += self.snapshot.synergy_score(*a, *b).unwrap_or(0.0);
                pairs += 1;
            }
        }
        let synergy = if pairs == 0 {
            0.0
        } else {
            synergy_total / pairs as f64
        };

        (win_rate + synergy).clamp(0.0, 100.0)
    }
}

fn normalize(score: f64, min: f64, max: f64) -> f64 {
    let range = max - min;
    if range.abs() < f64::EPSILON {
        50.0
    } else {
        ((score - min) / range) * 100.0
    }
}
