//! Entry point for callers: wires the champion catalog, the snapshot store
//! and scoring settings behind the request/response shapes in `api::models`.

use crate::analysis::champion_stats::{meta_ranking, ChampionStat};
use crate::analysis::predictions::PredictionAssembler;
use crate::analysis::scorer::{rank_candidates, RankedCandidate};
use crate::analysis::snapshot::{SnapshotStore, StatsSnapshot};
use crate::analysis::synergy::PairSynergy;
use crate::api::models::{
    round1, ChampionDetailDto, ChampionMetaDto, DraftRequest, GameAnalysisDto, GameMove,
    GameSummaryDto, MatchupsDto, MovePredictionResponse, PartnerDto, PredictionDto,
    PredictionResponse, SynergyDto,
};
use crate::champions::{ChampionCatalog, ChampionId, ChampionRef};
use crate::config::ScoringSettings;
use crate::draft::{DraftContext, Phase};
use crate::error::AppError;
use crate::store::{GameRecord, RecordStore};
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::info;

/// Synergy partners listed in a champion detail.
pub const DETAIL_PARTNERS: usize = 5;

pub struct DraftEngine {
    catalog: ChampionCatalog,
    snapshots: SnapshotStore,
    settings: ScoringSettings,
}

impl DraftEngine {
    pub fn new(catalog: ChampionCatalog, settings: ScoringSettings) -> Self {
        Self::with_snapshots(catalog, SnapshotStore::new(), settings)
    }

    pub fn with_snapshots(
        catalog: ChampionCatalog,
        snapshots: SnapshotStore,
        settings: ScoringSettings,
    ) -> Self {
        DraftEngine {
            catalog,
            snapshots,
            settings,
        }
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    pub fn snapshot(&self) -> Arc<StatsSnapshot> {
        self.snapshots.snapshot()
    }

    /// Applies new records. `DataUnavailable` still leaves a usable (empty) snapshot.
    pub fn refresh(&self, store: &dyn RecordStore) -> Result<Arc<StatsSnapshot>, AppError> {
        self.snapshots.refresh(store)
    }

    pub fn rebuild(&self, store: &dyn RecordStore) -> Result<Arc<StatsSnapshot>, AppError> {
        self.snapshots.rebuild(store)
    }

    pub fn context(&self, request: &DraftRequest) -> Result<DraftContext, AppError> {
        request.to_context(&self.catalog)
    }

    /// Ranks every catalog champion still available in `context`.
    pub fn rank(
        &self,
        context: &DraftContext,
        snapshot: &StatsSnapshot,
    ) -> Result<Vec<RankedCandidate>, AppError> {
        let pool: Vec<ChampionId> = self.catalog.ids().collect();
        rank_candidates(context, &pool, &self.catalog, snapshot, &self.settings)
    }

    pub fn predict_champions(
        &self,
        request: &DraftRequest,
        top_n: usize,
    ) -> Result<PredictionResponse, AppError> {
        let context = self.context(request)?;
        let snapshot = self.snapshot();

        let ranked = self.rank(&context, &snapshot)?;
        let assembler = PredictionAssembler::new(&self.catalog, &snapshot, &self.settings, &context);
        let predictions: Vec<PredictionDto> = assembler
            .build(&ranked, top_n)?
            .iter()
            .map(PredictionDto::from)
            .collect();
        let analysis = assembler.analyze_game()?;

        info!(
            snapshot = snapshot.version(),
            candidates = ranked.len(),
            returned = predictions.len(),
            "champion predictions built"
        );

        Ok(PredictionResponse {
            top_pick: predictions.first().cloned(),
            predictions,
            game_analysis: GameAnalysisDto::from(&analysis),
            timestamp: Utc::now(),
        })
    }

    /// Next pick or ban of the standard draft order, filled with the best candidate.
    pub fn predict_move(&self, request: &DraftRequest) -> Result<MovePredictionResponse, AppError> {
        let mut context = self.context(request)?;
        let step = context
            .next_step()
            .ok_or_else(|| AppError::invalid("the draft is already complete"))?;
        context.phase = step.action;
        context.turn = Some(step.side);

        let snapshot = self.snapshot();
        let ranked = self.rank(&context, &snapshot)?;
        let top = ranked
            .first()
            .ok_or_else(|| AppError::invalid("no champions left to draft"))?;

        let assembler = PredictionAssembler::new(&self.catalog, &snapshot, &self.settings, &context);
        let prediction = assembler
            .build(&ranked, 1)?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::InternalInconsistency("ranked pool lost its top candidate".into()))?;

        Ok(MovePredictionResponse {
            predicted_moves: vec![GameMove {
                timestamp: Utc::now(),
                action: step.action,
                champion: self.catalog.name_of(top.champion)?.to_string(),
                team: step.side,
                phase: step.round,
            }],
            confidence: round1(move_confidence(&ranked) * 100.0) / 100.0,
            reasoning: prediction.reasoning,
        })
    }

    /// Every catalog champion, most picked first.
    pub fn champion_meta(&self) -> Vec<ChampionMetaDto> {
        let snapshot = self.snapshot();
        let total = snapshot.total_games();

        let stats: BTreeMap<ChampionId, ChampionStat> = self
            .catalog
            .ids()
            .map(|id| (id, self.stat_or_default(&snapshot, id)))
            .collect();

        meta_ranking(&stats, total)
            .iter()
            .filter_map(|stat| {
                let champion = self.catalog.get(stat.champion).ok()?;
                Some(ChampionMetaDto {
                    champion_id: champion.id.0,
                    name: champion.name.clone(),
                    role: champion.role,
                    pick_rate: round1(stat.pick_rate(total)),
                    ban_rate: round1(stat.ban_rate(total)),
                    win_rate: stat.win_rate().map(round1),
                    games: stat.picks,
                })
            })
            .collect()
    }

    /// Rates for one champion plus its best partners and its matchups
    /// against every recorded opponent.
    pub fn champion_detail(&self, reference: &ChampionRef) -> Result<ChampionDetailDto, AppError> {
        let id = self.catalog.resolve(reference)?;
        let champion = self.catalog.get(id)?;
        let snapshot = self.snapshot();
        let total = snapshot.total_games();
        let stat = self.stat_or_default(&snapshot, id);

        let mut partners: Vec<(ChampionId, &PairSynergy)> = snapshot
            .pair_synergies()
            .values()
            .filter(|s| s.games_together >= self.settings.matchup_min_games)
            .filter_map(|s| s.pair.partner(id).map(|partner| (partner, s)))
            .filter(|(partner, _)| self.catalog.contains(*partner))
            .collect();
        partners.sort_by(|a, b| b.1.score.total_cmp(&a.1.score).then_with(|| a.0.cmp(&b.0)));

        let synergies = partners
            .iter()
            .take(DETAIL_PARTNERS)
            .map(|(partner, s)| {
                Ok(PartnerDto {
                    champion: self.catalog.name_of(*partner)?.to_string(),
                    games_together: s.games_together,
                    win_rate_together: round1(s.win_rate_together),
                    synergy: round1(s.score),
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        // no draft in progress, so matchups cover every recorded opponent
        let context = DraftContext::new(Phase::Pick);
        let assembler = PredictionAssembler::new(&self.catalog, &snapshot, &self.settings, &context);
        let matchups = MatchupsDto::from(&assembler.matchups(id)?);

        Ok(ChampionDetailDto {
            champion_id: id.0,
            name: champion.name.clone(),
            role: champion.role,
            pick_rate: round1(stat.pick_rate(total)),
            ban_rate: round1(stat.ban_rate(total)),
            win_rate: stat.win_rate().map(round1),
            games: stat.picks,
            wins: stat.wins,
            losses: stat.losses(),
            bans: stat.bans,
            synergies,
            matchups,
        })
    }

    /// Stored games, most recent first; equal timestamps list the later
    /// ingested game first. A missing store is an empty history.
    pub fn game_history(
        &self,
        store: &dyn RecordStore,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<GameSummaryDto>, AppError> {
        if limit == 0 {
            return Err(AppError::invalid("limit must be at least 1"));
        }

        let mut records = match store.all_records() {
            Ok(records) => records,
            Err(AppError::DataUnavailable(_)) => Vec::new(),
            Err(e) => return Err(e),
        };
        records.reverse();
        records.sort_by(|a, b| b.played_at.cmp(&a.played_at));

        Ok(records
            .iter()
            .skip(offset)
            .take(limit)
            .map(|record| self.game_summary(record))
            .collect())
    }

    fn game_summary(&self, record: &GameRecord) -> GameSummaryDto {
        GameSummaryDto {
            game_id: record.id.clone(),
            played_at: record.played_at,
            blue_team: self.names(&record.blue_team),
            red_team: self.names(&record.red_team),
            blue_bans: self.names(&record.blue_bans),
            red_bans: self.names(&record.red_bans),
            winner: record.winner,
            duration_secs: record.duration_secs,
        }
    }

    // stored records may predate a catalog change, so unknown ids print as "#id"
    fn names(&self, ids: &[ChampionId]) -> Vec<String> {
        ids.iter()
            .map(|id| {
                self.catalog
                    .name_of(*id)
                    .map(str::to_string)
                    .unwrap_or_else(|_| id.to_string())
            })
            .collect()
    }

    fn stat_or_default(&self, snapshot: &StatsSnapshot, id: ChampionId) -> ChampionStat {
        snapshot
            .champion(id)
            .cloned()
            .unwrap_or_else(|| ChampionStat::new(id))
    }

    pub fn win_rates(&self) -> BTreeMap<String, Option<f64>> {
        let snapshot = self.snapshot();
        self.catalog
            .all_champions()
            .into_iter()
            .map(|c| (c.name, snapshot.win_rate(c.id).map(round1)))
            .collect()
    }

    pub fn pair_synergy(&self, a: &ChampionRef, b: &ChampionRef) -> Result<SynergyDto, AppError> {
        let a = self.catalog.resolve(a)?;
        let b = self.catalog.resolve(b)?;
        self.synergy_between(&self.snapshot(), a, b)
    }

    /// One report per unordered pair of `champions`. Any unknown champion
    /// fails the whole request.
    pub fn team_synergy(&self, champions: &[ChampionRef]) -> Result<Vec<SynergyDto>, AppError> {
        if champions.is_empty() {
            return Err(AppError::invalid("champions list is required"));
        }

        let mut ids = Vec::new();
        let mut seen = BTreeSet::new();
        for reference in champions {
            let id = self.catalog.resolve(reference)?;
            if seen.insert(id) {
                ids.push(id);
            }
        }

        let snapshot = self.snapshot();
        let mut reports = Vec::new();
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                reports.push(self.synergy_between(&snapshot, *a, *b)?);
            }
        }
        Ok(reports)
    }

    fn synergy_between(
        &self,
        snapshot: &StatsSnapshot,
        a: ChampionId,
        b: ChampionId,
    ) -> Result<SynergyDto, AppError> {
        let entry = snapshot.synergy(a, b)?;
        Ok(SynergyDto {
            champ_a: self.catalog.name_of(a)?.to_string(),
            champ_b: self.catalog.name_of(b)?.to_string(),
            synergy: entry.map(|s| round1(s.score)),
            win_rate_together: entry.map(|s| round1(s.win_rate_together)),
            games_together: entry.map(|s| s.games_together).unwrap_or(0),
        })
    }
}

/// 0.5 plus half of the lead over the runner-up, relative to the pool's score range.
fn move_confidence(ranked: &[RankedCandidate]) -> f64 {
    match ranked {
        [] => 0.0,
        [_] => 1.0,
        [top, second, ..] => {
            let min = ranked.iter().map(|c| c.score).fold(f64::INFINITY, f64::min);
            let range = top.score - min;
            if range.abs() < f64::EPSILON {
                0.5
            } else {
                0.5 + 0.5 * ((top.score - second.score) / range)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::champions::{Champion, Role};
    use crate::draft::Phase;
    use crate::store::tests::game;
    use crate::store::{JsonRecordStore, MemoryRecordStore, Side};
    use chrono::Duration;

    fn engine() -> DraftEngine {
        let catalog = ChampionCatalog::new(vec![
            Champion::new(1, "Garen", Role::Top),
            Champion::new(2, "Vi", Role::Jungle),
            Champion::new(3, "Orianna", Role::Mid),
            Champion::new(4, "Jinx", Role::Adc),
            Champion::new(5, "Thresh", Role::Support),
        ])
        .unwrap();
        DraftEngine::new(catalog, ScoringSettings::default())
    }

    fn request(phase: Phase) -> DraftRequest {
        DraftRequest {
            blue_team: Vec::new(),
            red_team: Vec::new(),
            blue_bans: Vec::new(),
            red_bans: Vec::new(),
            current_phase: phase,
            turn: None,
        }
    }

    #[test]
    fn test_predict_with_empty_store_uses_neutral_defaults() {
        let engine = engine();
        let store = MemoryRecordStore::default();
        assert!(engine.refresh(&store).unwrap_err().is_degraded());

        let response = engine.predict_champions(&request(Phase::Pick), 3).unwrap();
        let names: Vec<&str> = response.predictions.iter().map(|p| p.champion.as_str()).collect();
        assert_eq!(names, vec!["Garen", "Vi", "Orianna"]);
        assert!(response.predictions.iter().all(|p| p.win_rate.is_none()));
        assert_eq!(response.top_pick.unwrap().champion, "Garen");
    }

    #[test]
    fn test_predict_move_follows_draft_order() {
        let engine = engine();
        let store = MemoryRecordStore::new(vec![
            game("g1", &[3], &[1], Side::Blue),
            game("g2", &[3], &[2], Side::Blue),
        ]);
        engine.refresh(&store).unwrap();

        let response = engine.predict_move(&request(Phase::Pick)).unwrap();
        let step = &response.predicted_moves[0];
        assert_eq!(step.action, Phase::Ban);
        assert_eq!(step.team, Side::Blue);
        assert_eq!(step.phase, 1);
        // blue bans what red would want most
        assert_eq!(step.champion, "Orianna");
        assert!(response.confidence > 0.5);
    }

    #[test]
    fn test_team_synergy_rejects_unknown_champion() {
        let engine = engine();
        let result = engine.team_synergy(&[
            ChampionRef::Name("Vi".into()),
            ChampionRef::Name("Nobody".into()),
        ]);
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert!(matches!(engine.team_synergy(&[]), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_team_synergy_reports_every_pair() {
        let engine = engine();
        let store = MemoryRecordStore::new(vec![game("g1", &[1, 2, 3], &[4, 5], Side::Blue)]);
        engine.refresh(&store).unwrap();

        let reports = engine
            .team_synergy(&[
                ChampionRef::Id(1),
                ChampionRef::Id(2),
                ChampionRef::Id(3),
            ])
            .unwrap();
        assert_eq!(reports.len(), 3);
        assert!(reports.iter().all(|r| r.games_together == 1));
    }

    #[test]
    fn test_champion_meta_lists_whole_catalog() {
        let engine = engine();
        let store = MemoryRecordStore::new(vec![game("g1", &[4], &[5], Side::Red)]);
        engine.refresh(&store).unwrap();

        let meta = engine.champion_meta();
        assert_eq!(meta.len(), 5);
        assert_eq!(meta[0].name, "Jinx");
        assert_eq!(meta[1].name, "Thresh");
        assert_eq!(meta[1].win_rate, Some(100.0));
        assert_eq!(meta[2].win_rate, None);
        assert_eq!(engine.win_rates()["Jinx"], Some(0.0));
    }

    #[test]
    fn test_champion_detail_partners_and_matchups() {
        let engine = engine();
        let store = MemoryRecordStore::new(vec![
            game("g1", &[1, 2, 3], &[4, 5], Side::Blue),
            game("g2", &[1, 2], &[3, 4], Side::Red),
            game("g3", &[1, 3], &[2, 5], Side::Blue),
        ]);
        engine.refresh(&store).unwrap();

        let detail = engine.champion_detail(&ChampionRef::Name("garen".into())).unwrap();
        assert_eq!(detail.champion_id, 1);
        assert_eq!((detail.games, detail.wins, detail.losses, detail.bans), (3, 2, 1, 0));
        assert_eq!(detail.pick_rate, 100.0);
        assert_eq!(detail.win_rate, Some(66.7));

        // Orianna: 100% together vs a 83.3% baseline; Vi: 50% vs 50%
        let partners: Vec<(&str, u32, f64)> = detail
            .synergies
            .iter()
            .map(|p| (p.champion.as_str(), p.games_together, p.synergy))
            .collect();
        assert_eq!(partners, vec![("Orianna", 2, 16.7), ("Vi", 2, 0.0)]);

        assert_eq!(detail.matchups.good, vec!["Vi", "Thresh"]);
        assert_eq!(detail.matchups.bad, vec!["Orianna", "Jinx"]);
    }

    #[test]
    fn test_champion_detail_without_games() {
        let engine = engine();
        let detail = engine.champion_detail(&ChampionRef::Id(5)).unwrap();
        assert_eq!(detail.win_rate, None);
        assert_eq!(detail.losses, 0);
        assert!(detail.synergies.is_empty());
        assert!(detail.matchups.good.is_empty());

        let unknown = engine.champion_detail(&ChampionRef::Id(99));
        assert!(matches!(unknown, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_game_history_most_recent_first() {
        let engine = engine();
        let mut first = game("g1", &[1], &[2], Side::Blue);
        let mut second = game("g2", &[3], &[4], Side::Red);
        let mut third = game("g3", &[5], &[1], Side::Blue);
        first.played_at = first.played_at + Duration::days(1);
        second.played_at = second.played_at + Duration::days(3);
        third.played_at = third.played_at + Duration::days(2);
        third.red_bans = vec![ChampionId(42)];
        let store = MemoryRecordStore::new(vec![first, second, third]);

        let all = engine.game_history(&store, 10, 0).unwrap();
        let ids: Vec<&str> = all.iter().map(|g| g.game_id.as_str()).collect();
        assert_eq!(ids, vec!["g2", "g3", "g1"]);
        assert_eq!(all[1].blue_team, vec!["Thresh"]);
        assert_eq!(all[1].red_bans, vec!["#42"]);

        let page = engine.game_history(&store, 2, 1).unwrap();
        let ids: Vec<&str> = page.iter().map(|g| g.game_id.as_str()).collect();
        assert_eq!(ids, vec!["g3", "g1"]);

        assert!(engine.game_history(&store, 10, 5).unwrap().is_empty());
        assert!(matches!(engine.game_history(&store, 0, 0), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_game_history_ties_list_latest_ingested_first() {
        let engine = engine();
        let store = MemoryRecordStore::new(vec![
            game("g1", &[1], &[2], Side::Blue),
            game("g2", &[1], &[2], Side::Red),
        ]);
        let ids: Vec<String> = engine
            .game_history(&store, 5, 0)
            .unwrap()
            .into_iter()
            .map(|g| g.game_id)
            .collect();
        assert_eq!(ids, vec!["g2", "g1"]);
    }

    #[test]
    fn test_game_history_of_missing_store_is_empty() {
        let engine = engine();
        let store = JsonRecordStore::new(std::env::temp_dir().join("draft_insight_no_history.json"));
        assert!(engine.game_history(&store, 10, 0).unwrap().is_empty());
    }
}
