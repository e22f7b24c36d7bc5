use crate::analysis::predictions::{GameAnalysis, MatchupBreakdown, Prediction};
use crate::champions::{ChampionCatalog, ChampionRef, Role};
use crate::draft::{DraftContext, Phase};
use crate::error::AppError;
use crate::store::Side;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Draft state sent by the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftRequest {
    #[serde(default)]
    pub blue_team: Vec<ChampionRef>,
    #[serde(default)]
    pub red_team: Vec<ChampionRef>,
    #[serde(default)]
    pub blue_bans: Vec<ChampionRef>,
    #[serde(default)]
    pub red_bans: Vec<ChampionRef>,
    pub current_phase: Phase,
    #[serde(default)]
    pub turn: Option<Side>,
}

impl DraftRequest {
    /// Malformed bodies are caller errors, not JSON plumbing errors.
    pub fn from_json(body: &str) -> Result<Self, AppError> {
        serde_json::from_str(body)
            .map_err(|e| AppError::invalid(format!("malformed draft state: {}", e)))
    }

    pub fn to_context(&self, catalog: &ChampionCatalog) -> Result<DraftContext, AppError> {
        let resolve = |refs: &[ChampionRef]| {
            refs.iter()
                .map(|r| catalog.resolve(r))
                .collect::<Result<Vec<_>, _>>()
        };

        let context = DraftContext {
            blue_picks: resolve(&self.blue_team)?,
            red_picks: resolve(&self.red_team)?,
            blue_bans: resolve(&self.blue_bans)?,
            red_bans: resolve(&self.red_bans)?,
            phase: self.current_phase,
            turn: self.turn,
        };
        context.validate(catalog)?;
        Ok(context)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchupsDto {
    pub good: Vec<String>,
    pub bad: Vec<String>,
    pub neutral: Vec<String>,
}

impl From<&MatchupBreakdown> for MatchupsDto {
    fn from(breakdown: &MatchupBreakdown) -> Self {
        MatchupsDto {
            good: breakdown.good.clone(),
            bad: breakdown.bad.clone(),
            neutral: breakdown.neutral.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionDto {
    pub champion: String,
    pub role: Role,
    /// Relative to the ranked pool, not a probability.
    pub confidence: f64,
    /// `null` when the champion has never been picked.
    pub win_rate: Option<f64>,
    pub synergy: f64,
    pub reasoning: String,
    pub matchups: MatchupsDto,
}

impl From<&Prediction> for PredictionDto {
    fn from(prediction: &Prediction) -> Self {
        PredictionDto {
            champion: prediction.name.clone(),
            role: prediction.role,
            confidence: round1(prediction.confidence),
            win_rate: prediction.win_rate.map(round1),
            synergy: round1(prediction.synergy),
            reasoning: prediction.reasoning.clone(),
            matchups: MatchupsDto::from(&prediction.matchups),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameAnalysisDto {
    pub blue_team_strength: f64,
    pub red_team_strength: f64,
    pub recommended_role: Option<Role>,
}

impl From<&GameAnalysis> for GameAnalysisDto {
    fn from(analysis: &GameAnalysis) -> Self {
        GameAnalysisDto {
            blue_team_strength: round1(analysis.blue_team_strength),
            red_team_strength: round1(analysis.red_team_strength),
            recommended_role: analysis.recommended_role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResponse {
    pub predictions: Vec<PredictionDto>,
    pub top_pick: Option<PredictionDto>,
    pub game_analysis: GameAnalysisDto,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMove {
    pub timestamp: DateTime<Utc>,
    pub action: Phase,
    pub champion: String,
    pub team: Side,
    /// Draft round, 1-4.
    pub phase: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovePredictionResponse {
    pub predicted_moves: Vec<GameMove>,
    /// 0.5 when the top candidates are tied, 1.0 when the pick is uncontested.
    pub confidence: f64,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChampionMetaDto {
    pub champion_id: u32,
    pub name: String,
    pub role: Role,
    pub pick_rate: f64,
    pub ban_rate: f64,
    pub win_rate: Option<f64>,
    pub games: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynergyDto {
    pub champ_a: String,
    pub champ_b: String,
    /// Percentage points; `null` when never on a team together.
    pub synergy: Option<f64>,
    pub win_rate_together: Option<f64>,
    pub games_together: u32,
}

/// One stored game with champion names resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummaryDto {
    pub game_id: String,
    pub played_at: DateTime<Utc>,
    pub blue_team: Vec<String>,
    pub red_team: Vec<String>,
    pub blue_bans: Vec<String>,
    pub red_bans: Vec<String>,
    pub winner: Side,
    pub duration_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerDto {
    pub champion: String,
    pub games_together: u32,
    pub win_rate_together: f64,
    pub synergy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChampionDetailDto {
    pub champion_id: u32,
    pub name: String,
    pub role: Role,
    pub pick_rate: f64,
    pub ban_rate: f64,
    pub win_rate: Option<f64>,
    pub games: u32,
    pub wins: u32,
    pub losses: u32,
    pub bans: u32,
    /// Best partners first.
    pub synergies: Vec<PartnerDto>,
    pub matchups: MatchupsDto,
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
