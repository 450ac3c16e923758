//! Command line entry point for the padel-rating engine
//!
//! Seeds initial ratings from trial matches and replays recorded match
//! results against a JSON roster of players.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use padel_rating::config::{AppConfig, RatingConfig};
use padel_rating::metrics::MetricsCollector;
use padel_rating::rating::storage::sort_by_rating_desc;
use padel_rating::rating::{InMemoryPlayerStore, PlayerStore, RatingEngine, RatingService};
use padel_rating::types::{HistoryKind, MatchRecord, Player, TrialResult};
use padel_rating::utils::current_timestamp;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Padel Rating - bounded skill ratings for padel doubles
#[derive(Parser)]
#[command(
    name = "padel-rating",
    version,
    about = "Rating engine for padel doubles tournaments",
    long_about = "Computes initial ratings from three trial matches and settles doubles \
                 results on a 0-7 scale, limiting how far any player can move in one day."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        global = true,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        global = true,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Enable debug mode
    #[arg(short, long, global = true, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Print Prometheus metrics after the command completes
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute a new player's rating from trial match outcomes
    InitRating {
        /// Outcome of each trial match, in order
        #[arg(long = "trial", value_enum, required = true)]
        trials: Vec<TrialOutcome>,

        /// Opponent rating of each trial (opponent-relative formula only)
        #[arg(long = "opponent")]
        opponents: Vec<f64>,
    },

    /// Replay match results against a roster of players
    Settle {
        /// JSON array of players
        #[arg(long, value_name = "FILE")]
        players: PathBuf,

        /// JSON array of match records
        #[arg(long, value_name = "FILE")]
        matches: PathBuf,

        /// Where to write the updated players (JSON); stdout leaderboard only if absent
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Number of leaderboard rows to print
        #[arg(long, default_value_t = 10)]
        top: usize,
    },

    /// Validate configuration and exit
    CheckConfig,
}

#[derive(Clone, Copy, ValueEnum)]
enum TrialOutcome {
    Win,
    Loss,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Load and merge configuration from file/environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::from_env()?,
    };

    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }
    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    padel_rating::config::validate_config(&config)?;
    Ok(config)
}

fn build_trials(outcomes: &[TrialOutcome], opponents: &[f64]) -> Result<Vec<TrialResult>> {
    if !opponents.is_empty() && opponents.len() != outcomes.len() {
        anyhow::bail!(
            "Got {} --opponent values for {} --trial values",
            opponents.len(),
            outcomes.len()
        );
    }

    Ok(outcomes
        .iter()
        .enumerate()
        .map(|(i, outcome)| TrialResult {
            won: matches!(outcome, TrialOutcome::Win),
            opponent_rating: opponents.get(i).copied(),
        })
        .collect())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Refuse rosters holding ratings the engine would reject match by match
fn check_roster(roster: &[Player], config: &RatingConfig) -> Result<()> {
    let (min, max) = (config.min_rating, config.max_rating);
    let invalid: Vec<&str> = roster
        .iter()
        .filter(|player| !(min <= player.rating && player.rating <= max))
        .map(|player| player.id.as_str())
        .collect();
    if !invalid.is_empty() {
        anyhow::bail!(
            "{} players have ratings outside [{}, {}]: {}",
            invalid.len(),
            min,
            max,
            invalid.join(", ")
        );
    }
    Ok(())
}

fn settle(
    service: &RatingService,
    matches_path: &Path,
    output: Option<&Path>,
    store: &InMemoryPlayerStore,
    top: usize,
) -> Result<()> {
    let records: Vec<MatchRecord> = read_json(matches_path)?;
    info!("Replaying {} matches", records.len());

    let mut rejected = 0usize;
    for (index, record) in records.iter().enumerate() {
        let played_at = record.played_at.unwrap_or_else(current_timestamp);
        if let Err(e) = service.record_match_at(record, played_at) {
            error!("Match #{} rejected: {}", index + 1, e);
            rejected += 1;
        }
    }
    if rejected > 0 {
        warn!("{} of {} matches rejected", rejected, records.len());
    }

    if let Some(path) = output {
        let mut players = store.get_all_players()?;
        sort_by_rating_desc(&mut players);
        let json = serde_json::to_string_pretty(&players)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {} players to {}", players.len(), path.display());
    }

    println!("{:<4} {:<24} {:>7} {:>6}", "#", "player", "rating", "games");
    for (rank, player) in service.leaderboard(Some(top))?.iter().enumerate() {
        let label = if player.name.is_empty() {
            &player.id
        } else {
            &player.name
        };
        let games = player
            .rating_history
            .iter()
            .filter(|entry| entry.kind == HistoryKind::Match)
            .count();
        println!(
            "{:<4} {:<24} {:>7.2} {:>6}",
            rank + 1,
            label,
            player.rating,
            games
        );
    }

    Ok(())
}

fn run(args: &Args, config: AppConfig, metrics: Arc<MetricsCollector>) -> Result<()> {
    let engine = Arc::new(RatingEngine::new(config.rating.clone())?.with_metrics(metrics.clone()));

    match &args.command {
        Command::CheckConfig => {
            info!("Configuration validation successful");
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Command::InitRating { trials, opponents } => {
            let trials = build_trials(trials, opponents)?;
            let rating = engine.initialize_rating(&trials)?;
            println!("{:.2}", rating);
        }
        Command::Settle {
            players,
            matches,
            output,
            top,
        } => {
            let roster: Vec<Player> = read_json(players)?;
            info!("Loaded {} players from {}", roster.len(), players.display());
            check_roster(&roster, engine.config())?;
            let store = Arc::new(InMemoryPlayerStore::with_players(roster));
            let service =
                RatingService::new(engine, store.clone()).with_metrics(metrics.clone());
            settle(&service, matches, output.as_deref(), &store, *top)?;
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {:#}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!("{} v{} starting", config.service.name, padel_rating::VERSION);

    let metrics = Arc::new(MetricsCollector::new()?);
    run(&args, config, metrics.clone())?;

    if args.metrics {
        print!("{}", metrics.gather()?);
    }

    Ok(())
}
