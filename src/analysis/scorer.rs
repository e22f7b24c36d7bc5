use crate::analysis::snapshot::StatsSnapshot;
use crate::champions::{ChampionCatalog, ChampionId};
use crate::config::ScoringSettings;
use crate::draft::DraftContext;
use crate::error::AppError;
use std::collections::BTreeSet;
use tracing::debug;

/// Unweighted inputs to a candidate's score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    /// Observed win rate, `None` without picks.
    pub win_rate: Option<f64>,
    /// Win rate term actually used (observed or the neutral default).
    pub win_rate_term: f64,
    /// Mean pair synergy against allies. Zero with no allies.
    pub synergy: f64,
    /// Mean matchup advantage against enemies. Zero with no enemies.
    pub counter: f64,
    /// Ally with the highest synergy score, if any pair has data.
    pub best_ally: Option<ChampionId>,
    /// Enemy with the highest matchup advantage, if any matchup has data.
    pub best_matchup: Option<ChampionId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub champion: ChampionId,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Scores every candidate of `pool` not yet picked or banned and orders
/// them by score descending, ties by id ascending.
///
/// Pure: the same context, pool, snapshot and settings always give the same
/// order. Every pool id must be in the catalog; an unknown id fails the whole
/// call with `InvalidInput`.
pub fn rank_candidates(
    context: &DraftContext,
    pool: &[ChampionId],
    catalog: &ChampionCatalog,
    snapshot: &StatsSnapshot,
    settings: &ScoringSettings,
) -> Result<Vec<RankedCandidate>, AppError> {
    context.validate(catalog)?;

    let mut candidates = BTreeSet::new();
    for id in pool {
        if !catalog.contains(*id) {
            return Err(AppError::invalid(format!(
                "candidate pool contains unknown champion id {}",
                id.0
            )));
        }
        candidates.insert(*id);
    }

    let unavailable = context.unavailable();
    let allies = context.allies();
    let enemies = context.enemies();

    let mut ranked: Vec<RankedCandidate> = candidates
        .difference(&unavailable)
        .map(|id| {
            let breakdown = score_breakdown(*id, allies, enemies, snapshot, settings);
            RankedCandidate {
                champion: *id,
                score: weighted_score(&breakdown, settings),
                breakdown,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.champion.cmp(&b.champion))
    });

    debug!(
        candidates = ranked.len(),
        excluded = unavailable.len(),
        snapshot = snapshot.version(),
        "ranked draft candidates"
    );

    Ok(ranked)
}

pub fn weighted_score(breakdown: &ScoreBreakdown, settings: &ScoringSettings) -> f64 {
    settings.win_rate_weight * breakdown.win_rate_term
        + settings.synergy_weight * breakdown.synergy
        + settings.counter_weight * breakdown.counter
}

pub fn score_breakdown(
    candidate: ChampionId,
    allies: &[ChampionId],
    enemies: &[ChampionId],
    snapshot: &StatsSnapshot,
    settings: &ScoringSettings,
) -> ScoreBreakdown {
    let win_rate = snapshot.win_rate(candidate);

    let mut best_ally: Option<(ChampionId, f64)> = None;
    let mut synergy_total = 0.0;
    for ally in allies {
        // pairs never drafted together contribute zero
        if let Some(score) = snapshot.synergy_score(candidate, *ally) {
            synergy_total += score;
            best_ally = pick_best(best_ally, *ally, score);
        }
    }

    let mut best_matchup: Option<(ChampionId, f64)> = None;
    let mut counter_total = 0.0;
    for enemy in enemies {
        if let Some(advantage) = snapshot.matchup_advantage(candidate, *enemy) {
            counter_total += advantage;
            best_matchup = pick_best(best_matchup, *enemy, advantage);
        }
    }

    ScoreBreakdown {
        win_rate,
        win_rate_term: win_rate.unwrap_or(settings.neutral_win_rate),
        synergy: mean(synergy_total, allies.len()),
        counter: mean(counter_total, enemies.len()),
        best_ally: best_ally.map(|(id, _)| id),
        best_matchup: best_matchup.map(|(id, _)| id),
    }
}

fn mean(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

fn pick_best(
    current: Option<(ChampionId, f64)>,
    id: ChampionId,
    value: f64,
) -> Option<(ChampionId, f64)> {
    match current {
        Some((best_id, best)) if best > value || (best == value && best_id < id) => {
            Some((best_id, best))
        }
        _ => Some((id, value)),
    }
}
