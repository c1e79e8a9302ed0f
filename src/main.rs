use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use ladder_tracker::config::AppConfig;
use ladder_tracker::fetch::{Fetcher, FetcherConfig};
use ladder_tracker::ingest;
use ladder_tracker::merge::merge_snapshots;
use ladder_tracker::models::{
    Faction, GameType, LadderPartition, RankSnapshot, SnapshotDay,
};
use ladder_tracker::parse_duration;
use ladder_tracker::provider::{HttpSnapshotProvider, SnapshotProvider};
use ladder_tracker::storage::{ParquetWriter, SnapshotStore, StorageConfig};
use ladder_tracker::sync::{SyncConfig, SyncOrchestrator};

#[derive(Parser)]
#[command(name = "ladder-tracker")]
#[command(about = "Local RTS ladder tracker with historic rank comparison")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: String,

    /// Data directory path (overrides the config file)
    #[arg(long)]
    data_dir: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Bind address (overrides the config file)
        #[arg(long)]
        host: Option<String>,

        /// Port number (overrides the config file)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Pull snapshot documents from the remote store
    Pull {
        /// Run one pull and exit
        #[arg(long)]
        once: bool,

        /// Run continuously at interval
        #[arg(long)]
        watch: bool,

        /// Pull interval (e.g., "6h", "30m")
        #[arg(long, default_value = "6h")]
        interval: String,

        /// Day to pull (unix day timestamp or YYYY-MM-DD, default: yesterday)
        #[arg(long)]
        day: Option<String>,

        /// Only pull this game type (requires --race)
        #[arg(long)]
        game_type: Option<String>,

        /// Only pull this faction (requires --game-type)
        #[arg(long)]
        race: Option<String>,

        /// Fetch and validate but don't store
        #[arg(long)]
        dry_run: bool,
    },

    /// Import a local snapshot document file
    Import {
        /// Path to the snapshot document (JSON)
        file: String,

        /// Day the document was captured for
        #[arg(long)]
        day: String,

        /// Game type of the document
        #[arg(long)]
        game_type: String,

        /// Faction of the document
        #[arg(long)]
        race: String,

        /// Parse and validate but don't store
        #[arg(long)]
        dry_run: bool,
    },

    /// Print a merged leaderboard table for two stored days
    Compare {
        /// Day to show (default: latest stored day)
        #[arg(long)]
        day: Option<String>,

        /// Historic day to compare against (default: the day before)
        #[arg(long)]
        historic: Option<String>,

        /// Game type
        #[arg(long, default_value = "1v1")]
        game_type: String,

        /// Faction
        #[arg(long, default_value = "soviet")]
        race: String,

        /// Max rows to print
        #[arg(long, default_value = "40")]
        limit: usize,
    },

    /// List days available in the store
    ListDays,

    /// Validate stored snapshots
    Validate {
        /// Only validate this day
        #[arg(long)]
        day: Option<String>,
    },

    /// Export stored snapshots to Parquet
    ExportParquet {
        /// Day to export
        #[arg(long)]
        day: Option<String>,

        /// Export every stored day
        #[arg(long)]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(Some(Path::new(&cli.config)))
        .with_context(|| format!("Failed to load config from {}", cli.config))?;
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = PathBuf::from(data_dir);
    }

    // Initialize tracing
    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting ladder-tracker v{}", env!("CARGO_PKG_VERSION"));

    let storage = StorageConfig::new(config.data_dir.clone());
    let store = SnapshotStore::new(storage.clone());

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            let state = ladder_tracker::api::state::AppState::new(storage);
            let app = ladder_tracker::api::build_router(state);
            let addr = format!("{}:{}", host, port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("Leaderboards API: http://{}", addr);
            axum::serve(listener, app).await?;
        }
        Commands::Pull {
            once,
            watch,
            interval: interval_str,
            day,
            game_type,
            race,
            dry_run,
        } => {
            let today = Utc::now().date_naive();
            let day = match day {
                Some(s) => s
                    .parse::<SnapshotDay>()
                    .with_context(|| format!("Invalid --day: {}", s))?
                    .clamp_to_window(today),
                None => SnapshotDay::latest_allowed(today),
            };

            let partitions = match (game_type, race) {
                (Some(gt), Some(race)) => vec![parse_partition(&gt, &race)?],
                (None, None) => LadderPartition::all(),
                _ => {
                    anyhow::bail!("--game-type and --race must be given together");
                }
            };

            let base_url = Url::parse(&config.source.base_url)
                .with_context(|| format!("Invalid source base_url: {}", config.source.base_url))?;
            let fetcher = Fetcher::new(FetcherConfig {
                cache_dir: storage.raw_dir(),
                cache_ttl: Duration::from_secs(config.source.cache_ttl_seconds),
                timeout: Duration::from_secs(config.source.timeout_seconds),
                ..Default::default()
            })?;
            let provider: Arc<dyn SnapshotProvider> =
                Arc::new(HttpSnapshotProvider::new(fetcher, base_url));

            let pull_interval =
                parse_duration(&interval_str).unwrap_or(Duration::from_secs(6 * 3600));

            let sync_config = SyncConfig {
                days: vec![day],
                partitions,
                interval: pull_interval,
                rank_cutoff: config.ladder.rank_cutoff,
                dry_run,
            };
            let orchestrator = SyncOrchestrator::new(sync_config, provider, store);

            if once {
                tracing::info!("Running one-time pull for {}...", day.date());
                match orchestrator.sync_once().await {
                    Ok(result) => {
                        println!("\n=== Pull Results ===");
                        println!("Snapshots stored: {}", result.snapshots_synced);
                        println!("Entries:          {}", result.entries_synced);
                        println!("Missing remotely: {}", result.snapshots_missing);
                        println!("Duration:         {:?}", result.duration);
                        if dry_run {
                            println!("\n(dry run - no data written to disk)");
                        }
                        if !result.errors.is_empty() {
                            println!("\nErrors:");
                            for err in &result.errors {
                                println!("  - {}", err);
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!("Pull failed: {}", e);
                    }
                }
            } else if watch {
                tracing::info!("Running periodic pull (interval: {})...", interval_str);
                let orchestrator = Arc::new(orchestrator);
                orchestrator.run_periodic().await;
            } else {
                eprintln!("Specify --once or --watch");
            }
        }
        Commands::Import {
            file,
            day,
            game_type,
            race,
            dry_run,
        } => {
            let day: SnapshotDay = day
                .parse()
                .with_context(|| format!("Invalid --day: {}", day))?;
            let partition = parse_partition(&game_type, &race)?;

            let result = ingest::import_file(Path::new(&file), partition, day, &store, dry_run)
                .with_context(|| format!("Failed to import {}", file))?;

            println!("\n=== Import Results ===");
            println!("Partition:  {}", partition);
            println!("Day:        {} ({})", day, day.date());
            println!("Entries:    {}", result.entries);
            println!("Rank total: {}", result.rank_total);
            if dry_run {
                println!("\n(dry run - no data written to disk)");
            }
        }
        Commands::Compare {
            day,
            historic,
            game_type,
            race,
            limit,
        } => {
            let partition = parse_partition(&game_type, &race)?;

            let day = match day {
                Some(s) => s
                    .parse::<SnapshotDay>()
                    .with_context(|| format!("Invalid --day: {}", s))?,
                None => store
                    .list_days()?
                    .last()
                    .copied()
                    .context("Store is empty; pull or import a snapshot first")?,
            };
            let historic_day = match historic {
                Some(s) => s
                    .parse::<SnapshotDay>()
                    .with_context(|| format!("Invalid --historic: {}", s))?,
                None => day.pred(),
            };

            let current = store.read(day, partition)?;
            let historic_snapshot = store.read(historic_day, partition)?;
            if current.is_none() {
                println!("No snapshot stored for {} on {}", partition, day.date());
                return Ok(());
            }
            if historic_snapshot.is_none() {
                println!(
                    "No historic snapshot for {} (every row will show \"new\")",
                    historic_day.date()
                );
            }

            let rows = merge_snapshots(current.as_ref(), historic_snapshot.as_ref());
            let rank_total = current.as_ref().map(RankSnapshot::rank_total).unwrap_or(0);

            println!(
                "\nLeaderboards for {} as of {} (vs {})",
                partition,
                day.date(),
                historic_day.date()
            );
            println!("{} ranked on the full ladder\n", rank_total);
            println!(
                "{:>4}  {:>5}  {:>6}  {:<24}  {:>6}  {:>5}  {:>6}  {:>5}  {:>5}  {:>5}  {:>8}",
                "Rank", "Level", "Change", "Alias", "Streak", "Wins", "Losses", "Ratio",
                "Total", "Drops", "Disputes"
            );
            for row in rows.iter().take(limit) {
                let entry = &row.entry;
                println!(
                    "{:>4}  {:>5}  {:>6}  {:<24}  {:>+6}  {:>5}  {:>6}  {:>4}%  {:>5}  {:>5}  {:>8}",
                    entry.rank,
                    entry.rank_level,
                    row.change.to_string(),
                    entry.alias_line(),
                    entry.streak,
                    entry.wins,
                    entry.losses,
                    entry.win_ratio_percent(),
                    entry.total_games(),
                    entry.drops,
                    entry.disputes,
                );
            }
            if rows.len() > limit {
                println!("... {} more rows", rows.len() - limit);
            }
        }
        Commands::ListDays => {
            let days = store.list_days()?;
            if days.is_empty() {
                println!("Store is empty. Use `pull` or `import` to capture snapshots.");
            } else {
                println!("=== Stored Days ({}) ===\n", days.len());
                for day in days {
                    let partitions = store.list_partitions(day)?;
                    println!(
                        "  {} ({}) - {} partition(s)",
                        day,
                        day.date(),
                        partitions.len()
                    );
                }
            }
        }
        Commands::Validate { day } => {
            let days = match day {
                Some(s) => vec![s
                    .parse::<SnapshotDay>()
                    .with_context(|| format!("Invalid --day: {}", s))?],
                None => store.list_days()?,
            };

            let mut checked = 0u32;
            let mut failed = 0u32;
            for day in &days {
                for partition in store.list_partitions(*day)? {
                    checked += 1;
                    match store.read(*day, partition) {
                        Ok(Some(snapshot)) => {
                            if snapshot.len() as u32 > config.ladder.rank_cutoff {
                                println!(
                                    "  {} {}: {} entries exceeds the capture cutoff of {}",
                                    day,
                                    partition,
                                    snapshot.len(),
                                    config.ladder.rank_cutoff
                                );
                            }
                            tracing::debug!(
                                "{} {}: {} entries ok",
                                day,
                                partition,
                                snapshot.len()
                            );
                        }
                        Ok(None) => {
                            failed += 1;
                            println!("  {} {}: listed but unreadable", day, partition);
                        }
                        Err(e) => {
                            failed += 1;
                            println!("  {} {}: {}", day, partition, e);
                        }
                    }
                }
            }

            println!("\n=== Validation Results ===");
            println!("Snapshots checked: {}", checked);
            println!("Failed:            {}", failed);
            if failed > 0 {
                std::process::exit(1);
            }
        }
        Commands::ExportParquet { day, all } => {
            let days = if all {
                store.list_days()?
            } else {
                match day {
                    Some(s) => vec![s
                        .parse::<SnapshotDay>()
                        .with_context(|| format!("Invalid --day: {}", s))?],
                    None => anyhow::bail!("Specify --day or --all"),
                }
            };

            let writer = ParquetWriter::new(storage);
            let mut exported = 0u32;
            for day in &days {
                for partition in store.list_partitions(*day)? {
                    if let Some(snapshot) = store.read(*day, partition)? {
                        let path = writer.write_snapshot(&snapshot)?;
                        tracing::debug!("Exported {:?}", path);
                        exported += 1;
                    }
                }
            }

            println!("\n=== Export Results ===");
            println!("Days:      {}", days.len());
            println!("Snapshots: {}", exported);
        }
    }

    Ok(())
}

/// Parse and validate a (game type, faction) pair from CLI flags.
fn parse_partition(game_type: &str, race: &str) -> Result<LadderPartition> {
    let game_type: GameType = game_type
        .parse()
        .with_context(|| format!("Invalid --game-type: {}", game_type))?;
    let faction: Faction = race
        .parse()
        .with_context(|| format!("Invalid --race: {}", race))?;
    LadderPartition::new(game_type, faction).context("Invalid partition")
}
