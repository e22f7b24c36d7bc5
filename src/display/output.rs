use crate::api::models::{
    ChampionDetailDto, ChampionMetaDto, GameSummaryDto, MovePredictionResponse, PredictionResponse,
    SynergyDto,
};
use crate::store::Side;
use colored::*;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct PredictionRow {
    rank: String,
    champion: String,
    role: String,
    confidence: String,
    win_rate: String,
    synergy: String,
}

#[derive(Tabled)]
struct MetaRow {
    #[tabled(rename = "#")]
    number: String,
    champion: String,
    role: String,
    games: String,
    pick_rate: String,
    ban_rate: String,
    win_rate: String,
}

#[derive(Tabled)]
struct HistoryRow {
    game: String,
    played: String,
    blue: String,
    red: String,
    winner: String,
    length: String,
}

#[derive(Tabled)]
struct PartnerRow {
    partner: String,
    games: String,
    win_rate_together: String,
    synergy: String,
}

#[derive(Tabled)]
struct SynergyRow {
    pair: String,
    games: String,
    win_rate_together: String,
    synergy: String,
}

fn rate(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v),
        None => "n/a".to_string(),
    }
}

fn points(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:+.1}", v),
        None => "n/a".to_string(),
    }
}

pub fn display_predictions(response: &PredictionResponse) {
    println!("\n{}", "🎯 Draft Predictions".bold().cyan());
    println!("{}\n", "=".repeat(60).cyan());

    if response.predictions.is_empty() {
        println!("{}", "No champions left to recommend".yellow());
        return;
    }

    let rows: Vec<PredictionRow> = response
        .predictions
        .iter()
        .enumerate()
        .map(|(idx, p)| PredictionRow {
            rank: format!("#{}", idx + 1),
            champion: p.champion.clone(),
            role: p.role.to_string(),
            confidence: format!("{:.0}", p.confidence),
            win_rate: rate(p.win_rate),
            synergy: points(Some(p.synergy)),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);

    println!("\n{}", "Interpretation".bold().yellow());
    println!("• Confidence: position within this draft's candidate pool (100 = best), not a win probability");
    println!("• Win Rate: historical win rate when picked (n/a = no games yet)");
    println!("• Synergy: points above the average solo win rate with current allies\n");

    if let Some(top) = &response.top_pick {
        println!("{}", "Top Pick".bold().green());
        println!("  {} ({}) - {}", top.champion.bold(), top.role, top.reasoning);
        if !top.matchups.good.is_empty() {
            println!("  {} Good into: {}", "✓".green(), top.matchups.good.join(", "));
        }
        if !top.matchups.bad.is_empty() {
            println!("  {} Struggles into: {}", "⚠️".red(), top.matchups.bad.join(", "));
        }
    }

    let analysis = &response.game_analysis;
    println!("\n{}", "Game Analysis".bold().yellow());
    println!(
        "  Blue strength: {:.1}   Red strength: {:.1}",
        analysis.blue_team_strength, analysis.red_team_strength
    );
    if let Some(role) = analysis.recommended_role {
        println!("  Recommended role: {}", role.to_string().bold());
    }
    println!();
}

pub fn display_move(response: &MovePredictionResponse) {
    println!("\n{}", "🔮 Next Move".bold().cyan());
    println!("{}\n", "=".repeat(60).cyan());

    for step in &response.predicted_moves {
        let team = match step.team {
            Side::Blue => "BLUE".blue().bold(),
            Side::Red => "RED".red().bold(),
        };
        println!(
            "  {} {} {} (round {})",
            team,
            step.action.to_string().to_uppercase(),
            step.champion.bold(),
            step.phase
        );
    }
    println!("  Confidence: {:.0}%", response.confidence * 100.0);
    println!("  {}\n", response.reasoning);
}

pub fn display_meta(meta: &[ChampionMetaDto], total_games: u32) {
    println!(
        "\n{}",
        format!("📊 CHAMPION META ({} games)", total_games).bold().cyan()
    );
    println!("{}\n", "=".repeat(80).cyan());

    if meta.is_empty() {
        println!("{}", "No champions in the reference list".yellow());
        return;
    }

    let rows: Vec<MetaRow> = meta
        .iter()
        .enumerate()
        .map(|(idx, m)| MetaRow {
            number: format!("{}", idx + 1),
            champion: m.name.clone(),
            role: m.role.to_string(),
            games: m.games.to_string(),
            pick_rate: format!("{:.1}%", m.pick_rate),
            ban_rate: format!("{:.1}%", m.ban_rate),
            win_rate: rate(m.win_rate),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}\n", table);
}

pub fn display_synergy(reports: &[SynergyDto]) {
    println!("\n{}", "👥 SYNERGY".bold().cyan());
    println!("{}\n", "=".repeat(60).cyan());

    let rows: Vec<SynergyRow> = reports
        .iter()
        .map(|r| SynergyRow {
            pair: format!("{} + {}", r.champ_a, r.champ_b),
            games: r.games_together.to_string(),
            win_rate_together: rate(r.win_rate_together),
            synergy: points(r.synergy),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);

    if let Some(best) = reports
        .iter()
        .filter(|r| r.synergy.is_some())
        .max_by(|a, b| a.synergy.unwrap_or(0.0).total_cmp(&b.synergy.unwrap_or(0.0)))
    {
        let score = best.synergy.unwrap_or(0.0);
        let line = format!("  {} + {}: {:+.1} pts", best.champ_a, best.champ_b, score);
        if score > 0.0 {
            println!("\n{}\n{}", "Best Pair".bold().green(), line.green());
        } else {
            println!("\n{}\n{}", "Best Pair".bold().yellow(), line.yellow());
        }
    }
    println!();
}

pub fn display_history(games: &[GameSummaryDto]) {
    println!("\n{}", "📜 GAME HISTORY".bold().cyan());
    println!("{}\n", "=".repeat(80).cyan());

    if games.is_empty() {
        println!("{}", "No games recorded".yellow());
        return;
    }

    let rows: Vec<HistoryRow> = games
        .iter()
        .map(|g| HistoryRow {
            game: g.game_id.clone(),
            played: g.played_at.format("%Y-%m-%d %H:%M").to_string(),
            blue: g.blue_team.join(", "),
            red: g.red_team.join(", "),
            winner: g.winner.to_string().to_uppercase(),
            length: format!("{}:{:02}", g.duration_secs / 60, g.duration_secs % 60),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}\n", table);
}

pub fn display_champion(detail: &ChampionDetailDto) {
    println!(
        "\n{}",
        format!("🏆 {} ({})", detail.name, detail.role).bold().cyan()
    );
    println!("{}\n", "=".repeat(60).cyan());

    println!(
        "  Games: {}   Record: {}-{}   Win Rate: {}",
        detail.games,
        detail.wins,
        detail.losses,
        rate(detail.win_rate)
    );
    println!(
        "  Pick Rate: {:.1}%   Ban Rate: {:.1}% ({} bans)",
        detail.pick_rate, detail.ban_rate, detail.bans
    );

    if !detail.synergies.is_empty() {
        let rows: Vec<PartnerRow> = detail
            .synergies
            .iter()
            .map(|p| PartnerRow {
                partner: p.champion.clone(),
                games: p.games_together.to_string(),
                win_rate_together: format!("{:.1}%", p.win_rate_together),
                synergy: points(Some(p.synergy)),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("\n{}\n{}", "Best Partners".bold().yellow(), table);
    }

    let matchups = &detail.matchups;
    if !matchups.good.is_empty() {
        println!("\n  {} Good into: {}", "✓".green(), matchups.good.join(", "));
    }
    if !matchups.bad.is_empty() {
        println!("  {} Struggles into: {}", "⚠️".red(), matchups.bad.join(", "));
    }
    println!();
}

pub fn display_error(error: &str) {
    eprintln!("{} {}", "❌ Error:".red().bold(), error);
}

pub fn display_warning(message: &str) {
    eprintln!("{} {}", "⚠️".yellow(), message);
}

pub fn display_info(message: &str) {
    println!("{} {}", "ℹ️".cyan(), message);
}

pub fn display_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}
