use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use configuration::{Config, LogFormat, LoggingConfig};
use core_types::{
    ContestantId, GameId, LeaderboardEntry, ScoreEvent, ScoreRecord, StrategyId, TimeWindow,
};
use database::{connect, run_migrations, PgEventStore};
use engine::PopularityEngine;
use events::{EventQueryProvider, InMemoryEventStore, LeaderboardFilter};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// The main entry point for the Pulse popularity engine.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Optional: a .env file may carry DATABASE_URL and PULSE__* overrides.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = configuration::load_config_from(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    // Held for the life of the process so buffered file logs are flushed on exit.
    let _log_guard = init_tracing(&config.logging, cli.log_format)?;

    match cli.command {
        Commands::Rank(args) => handle_rank(args, &config).await,
        Commands::Leaderboard(args) => handle_leaderboard(args).await,
        Commands::Game { action } => handle_game(action).await,
        Commands::Submit(args) => handle_submit(args).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Ranks games by popularity from their score, session and upvote history.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Overrides `logging.format` from the configuration file.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every game and print the ranking.
    Rank(RankArgs),
    /// Print the raw score leaderboard, highest score first.
    Leaderboard(LeaderboardArgs),
    /// Start or end a game (toggles whether it accepts new scores).
    Game {
        #[command(subcommand)]
        action: GameAction,
    },
    /// Record a score for an active game.
    Submit(SubmitArgs),
}

#[derive(Parser)]
struct RankArgs {
    /// The scoring strategy ("trend" or "fleet"). Defaults to `scoring.default_strategy`.
    #[arg(long)]
    strategy: Option<StrategyId>,

    /// Reference time as RFC 3339 (e.g. "2024-07-02T12:00:00Z"). Defaults to now.
    #[arg(long)]
    at: Option<DateTime<Utc>>,

    /// Score a JSON event snapshot instead of the database.
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Emit JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct LeaderboardArgs {
    /// Only show scores for this game.
    #[arg(long)]
    game: Option<i64>,

    /// Only show scores from this UTC day (format: YYYY-MM-DD).
    #[arg(long)]
    date: Option<String>,

    /// Read a JSON event snapshot instead of the database.
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Emit JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct SubmitArgs {
    #[arg(long)]
    game: i64,

    #[arg(long)]
    contestant: i64,

    #[arg(long)]
    value: f64,

    /// When the score was achieved (RFC 3339). Defaults to now.
    #[arg(long)]
    at: Option<DateTime<Utc>>,
}

#[derive(Subcommand)]
enum GameAction {
    /// Mark a game active.
    Start { id: i64 },
    /// Mark a game inactive.
    End { id: i64 },
}

// ==============================================================================
// Logging
// ==============================================================================

/// Installs the global subscriber. `RUST_LOG` wins over `logging.level`.
fn init_tracing(
    logging: &LoggingConfig,
    format_override: Option<LogFormat>,
) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .with_context(|| format!("Invalid log level '{}'", logging.level))?;

    // Logs go to stderr so `--json` output on stdout stays machine-readable.
    let (writer, guard) = match &logging.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "pulse.log");
            let (file, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(std::io::stderr.and(file)), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(writer);
    match format_override.unwrap_or(logging.format) {
        LogFormat::Compact => tracing::subscriber::set_global_default(builder.compact().finish())?,
        LogFormat::Full => tracing::subscriber::set_global_default(builder.finish())?,
    }
    Ok(guard)
}

// ==============================================================================
// Providers
// ==============================================================================

fn load_fixture(path: &Path) -> anyhow::Result<Arc<InMemoryEventStore>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let store = InMemoryEventStore::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse event snapshot {}", path.display()))?;
    Ok(Arc::new(store))
}

async fn open_database() -> anyhow::Result<PgEventStore> {
    let pool = connect().await.context("Failed to connect to the database")?;
    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    Ok(PgEventStore::new(pool))
}

async fn open_provider(fixture: Option<&Path>) -> anyhow::Result<Arc<dyn EventQueryProvider>> {
    let provider: Arc<dyn EventQueryProvider> = match fixture {
        Some(path) => load_fixture(path)?,
        None => Arc::new(open_database().await?),
    };
    Ok(provider)
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_rank(args: RankArgs, config: &Config) -> anyhow::Result<()> {
    let strategy = args.strategy.unwrap_or(config.scoring.default_strategy);
    // Scoring never reads the clock itself; everything below works from this instant.
    let reference_time = args.at.unwrap_or_else(Utc::now);

    let provider = open_provider(args.fixture.as_deref()).await?;
    let engine = PopularityEngine::from_config(provider, strategy, &config.scoring)?;
    let ranked = engine.rank(reference_time).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
    } else {
        println!("{}", ranking_table(&ranked));
    }
    Ok(())
}

async fn handle_leaderboard(args: LeaderboardArgs) -> anyhow::Result<()> {
    // Reject a bad date before touching any backend.
    let window = args
        .date
        .as_deref()
        .map(TimeWindow::parse_day)
        .transpose()?;
    let filter = LeaderboardFilter {
        game: args.game.map(GameId),
        window,
    };

    let provider = open_provider(args.fixture.as_deref()).await?;
    let entries = provider.top_scores(filter).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        println!("{}", leaderboard_table(&entries));
    }
    Ok(())
}

async fn handle_game(action: GameAction) -> anyhow::Result<()> {
    let (id, is_active) = match action {
        GameAction::Start { id } => (GameId(id), true),
        GameAction::End { id } => (GameId(id), false),
    };
    let store = open_database().await?;
    let game = store.set_game_active(id, is_active).await?;
    let state = if game.is_active { "started" } else { "ended" };
    println!("Game {} ({}) {state}.", game.id, game.name);
    Ok(())
}

async fn handle_submit(args: SubmitArgs) -> anyhow::Result<()> {
    let score = ScoreEvent {
        game_id: GameId(args.game),
        contestant_id: ContestantId(args.contestant),
        value: args.value,
        timestamp: args.at.unwrap_or_else(Utc::now),
    };
    let store = open_database().await?;
    store.record_score(&score).await?;
    println!("Recorded {} for contestant {} in game {}.", score.value, args.contestant, score.game_id);
    Ok(())
}

// ==============================================================================
// Output
// ==============================================================================

fn ranking_table(ranked: &[ScoreRecord]) -> Table {
    let components: Vec<&str> = ranked
        .first()
        .map(|r| r.components.keys().map(String::as_str).collect())
        .unwrap_or_default();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    let mut header = vec!["#", "Game", "Score", "Active"];
    header.extend(components.iter().copied());
    table.set_header(header);

    for (position, record) in ranked.iter().enumerate() {
        let mut row = vec![
            (position + 1).to_string(),
            record.name.clone(),
            record.popularity_score.round_dp(2).to_string(),
            if record.is_active { "yes" } else { "no" }.to_string(),
        ];
        row.extend(
            components
                .iter()
                .map(|name| record.component(name).map_or_else(String::new, |v| v.round_dp(2).to_string())),
        );
        table.add_row(row);
    }
    table
}

fn leaderboard_table(entries: &[LeaderboardEntry]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Contestant", "Game", "Score", "Time"]);
    for (position, entry) in entries.iter().enumerate() {
        table.add_row(vec![
            (position + 1).to_string(),
            entry.contestant_name.clone(),
            entry.game_name.clone(),
            entry.score.to_string(),
            entry.timestamp.to_rfc3339(),
        ]);
    }
    table
}
