use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use draft_insight::analysis::snapshot::SnapshotStore;
use draft_insight::analysis::synergy::BaselineAverage;
use draft_insight::api::models::DraftRequest;
use draft_insight::cache::StatsCache;
use draft_insight::display::output::{
    display_champion, display_error, display_history, display_info, display_meta, display_move,
    display_predictions, display_success, display_synergy, display_warning,
};
use draft_insight::{
    AppError, ChampionCatalog, ChampionRef, Config, DraftEngine, GameRecord, JsonRecordStore,
};
use indicatif::ProgressBar;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "Draft Insight")]
#[command(about = "Champion pick/ban predictions from historical drafts", long_about = None)]
struct Args {
    /// Data directory (default: DRAFT_DATA_DIR or ~/.draft_insight)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Rebuild statistics from every stored record (ignore cache)
    #[arg(long, global = true)]
    refresh: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rank champions for the side about to act
    Predict {
        /// Draft state JSON file, or "-" for stdin
        #[arg(short, long)]
        draft: PathBuf,

        /// Number of predictions to display (default: 5)
        #[arg(short, long, default_value = "5")]
        top_n: usize,

        #[arg(long)]
        json: bool,
    },

    /// Predict the next pick or ban of the draft
    NextMove {
        /// Draft state JSON file, or "-" for stdin
        #[arg(short, long)]
        draft: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Pick, ban and win rates for every champion
    Meta {
        /// Only show the first N champions
        #[arg(short, long)]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Rates, best partners and matchups for one champion (name or id)
    Champion {
        champion: String,

        #[arg(long)]
        json: bool,
    },

    /// Stored games, most recent first
    History {
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Skip this many of the most recent games
        #[arg(long, default_value = "0")]
        offset: usize,

        #[arg(long)]
        json: bool,
    },

    /// Synergy between two champions (name or id)
    Synergy {
        champ_a: String,
        champ_b: String,

        #[arg(long)]
        json: bool,
    },

    /// Synergy for every pair of a team composition
    Team {
        #[arg(required = true, num_args = 2..)]
        champions: Vec<String>,

        #[arg(long)]
        json: bool,
    },

    /// Validate game records from a JSON file and add them to the record store
    Ingest { file: PathBuf },
}

fn main() {
    init_logging();
    let args = Args::parse();

    if let Err(e) = run(args) {
        display_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("draft_insight=info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: Args) -> Result<()> {
    let config = match args.data_dir {
        Some(dir) => Config::from_env_with_data_dir(dir)?,
        None => Config::from_env()?,
    };

    let catalog = ChampionCatalog::load(&config.champions_file)?;
    let store = JsonRecordStore::new(&config.records_file);

    if let Command::Ingest { file } = &args.command {
        ingest(file, &catalog, &store)?;
    }

    let engine = load_engine(&config, catalog, &store, args.refresh)?;

    match args.command {
        Command::Predict { draft, top_n, json } => {
            let request = read_draft(&draft)?;
            let response = engine.predict_champions(&request, top_n)?;
            if json {
                print_json(&response)?;
            } else {
                display_predictions(&response);
            }
        }
        Command::NextMove { draft, json } => {
            let request = read_draft(&draft)?;
            let response = engine.predict_move(&request)?;
            if json {
                print_json(&response)?;
            } else {
                display_move(&response);
            }
        }
        Command::Meta { limit, json } => {
            let mut meta = engine.champion_meta();
            if let Some(limit) = limit {
                meta.truncate(limit);
            }
            if json {
                print_json(&meta)?;
            } else {
                display_meta(&meta, engine.snapshot().total_games());
            }
        }
        Command::Champion { champion, json } => {
            let detail = engine.champion_detail(&champion_ref(champion))?;
            if json {
                print_json(&detail)?;
            } else {
                display_champion(&detail);
            }
        }
        Command::History {
            limit,
            offset,
            json,
        } => {
            let games = engine.game_history(&store, limit, offset)?;
            if json {
                print_json(&games)?;
            } else {
                display_history(&games);
            }
        }
        Command::Synergy {
            champ_a,
            champ_b,
            json,
        } => {
            let report = engine.pair_synergy(&champion_ref(champ_a), &champion_ref(champ_b))?;
            if json {
                print_json(&report)?;
            } else {
                display_synergy(std::slice::from_ref(&report));
            }
        }
        Command::Team { champions, json } => {
            let refs: Vec<ChampionRef> = champions.into_iter().map(champion_ref).collect();
            let reports = engine.team_synergy(&refs)?;
            if json {
                print_json(&reports)?;
            } else {
                display_synergy(&reports);
            }
        }
        Command::Ingest { .. } => {
            let snapshot = engine.snapshot();
            display_success(&format!(
                "Statistics now cover {} games (snapshot v{})",
                snapshot.total_games(),
                snapshot.version()
            ));
        }
    }

    Ok(())
}

/// Restores cached counts, applies whatever the store gained since, and
/// writes the cache back.
fn load_engine(
    config: &Config,
    catalog: ChampionCatalog,
    store: &JsonRecordStore,
    force_rebuild: bool,
) -> Result<DraftEngine> {
    let cache_path = config.cache_file();

    let cached = if force_rebuild {
        None
    } else {
        StatsCache::load(&cache_path)?.filter(|c| !c.is_stale(config.cache_max_age_mins))
    };

    let (snapshots, mut rebuilt_at) = match cached {
        Some(cache) => {
            let rebuilt_at = cache.rebuilt_at;
            let (accumulator, cursor) = cache.into_state()?;
            let snapshots = SnapshotStore::restore(accumulator, cursor, Box::new(BaselineAverage))?;
            (snapshots, Some(rebuilt_at))
        }
        None => (SnapshotStore::new(), None),
    };
    let engine = DraftEngine::with_snapshots(catalog, snapshots, config.scoring.clone());

    let result = if rebuilt_at.is_some() {
        match engine.refresh(store) {
            Err(AppError::InternalInconsistency(reason)) => {
                warn!(%reason, "cached statistics do not match the record store, rebuilding");
                rebuilt_at = None;
                engine.rebuild(store)
            }
            other => other,
        }
    } else {
        engine.rebuild(store)
    };
    let from_cache = rebuilt_at.is_some();
    let rebuilt_at = rebuilt_at.unwrap_or_else(Utc::now);

    match result {
        Ok(snapshot) => info!(
            version = snapshot.version(),
            games = snapshot.total_games(),
            from_cache,
            "statistics ready"
        ),
        Err(e) if e.is_degraded() => {
            display_warning(&format!("{} - predictions use neutral defaults", e));
        }
        Err(e) => return Err(e.into()),
    }

    let (accumulator, cursor) = engine.snapshots().export()?;
    if let Err(e) = StatsCache::from_state(&accumulator, cursor, rebuilt_at).save(&cache_path) {
        warn!(error = %e, "could not write stats cache");
    }

    Ok(engine)
}

fn ingest(file: &Path, catalog: &ChampionCatalog, store: &JsonRecordStore) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let records: Vec<GameRecord> =
        serde_json::from_str(&content).context("parsing game records")?;

    display_info(&format!("Validating {} game records...", records.len()));
    let pb = ProgressBar::new(records.len() as u64);
    pb.set_message("Validating records");

    let mut valid = Vec::with_capacity(records.len());
    let mut rejected = 0;
    for record in records {
        match record.validate_against(catalog) {
            Ok(()) => valid.push(record),
            Err(e) => {
                warn!(game = %record.id, error = %e, "rejected game record");
                rejected += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("✓ Records validated");

    let added = store.append(valid)?;
    display_success(&format!(
        "Added {} new records to {} ({} rejected)",
        added,
        store.path().display(),
        rejected
    ));
    Ok(())
}

fn read_draft(path: &Path) -> Result<DraftRequest> {
    let body = if path == Path::new("-") {
        let mut body = String::new();
        std::io::stdin()
            .read_to_string(&mut body)
            .context("reading draft state from stdin")?;
        body
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
    };
    Ok(DraftRequest::from_json(&body)?)
}

/// Numeric arguments are champion ids, anything else a name.
fn champion_ref(raw: String) -> ChampionRef {
    match raw.trim().parse::<u32>() {
        Ok(id) => ChampionRef::Id(id),
        Err(_) => ChampionRef::Name(raw),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
