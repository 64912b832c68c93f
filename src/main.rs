//! Wikiweave main entry point
//!
//! This is the command-line interface for the Wikiweave link-graph crawler.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use wikiweave::config::{load_config_with_hash, Config};
use wikiweave::crawler::run_crawl;
use wikiweave::output::{load_statistics, print_statistics};
use wikiweave::storage::{RunStatus, SqliteStorage};

/// Wikiweave: a multilingual encyclopedia link-graph crawler
///
/// Wikiweave walks the wiki content API breadth-first from a set of seed
/// articles, records typed links between articles across languages and
/// stores each article's source text.
#[derive(Parser, Debug)]
#[command(name = "wikiweave")]
#[command(version)]
#[command(about = "A multilingual encyclopedia link-graph crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Stop after this many rounds
    #[arg(long, value_name = "N")]
    rounds: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(config, &config_hash, cli.rounds).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("wikiweave=info,warn"),
            1 => EnvFilter::new("wikiweave=debug,info"),
            2 => EnvFilter::new("wikiweave=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> Result<()> {
    println!("=== Wikiweave Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Batch size: {}", config.crawler.batch_size);

    println!("\nAPI:");
    println!("  URL template: {}", config.api.url_template);
    println!("  Timeout: {}s", config.api.timeout_secs);
    println!("  Calls per second: {}", config.api.calls_per_second);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nStore:");
    println!("  Database: {}", config.store.database_path);
    println!("  Busy timeout: {}ms", config.store.busy_timeout_ms);

    println!("\nLanguages ({}):", config.languages.len());
    for entry in &config.languages {
        println!(
            "  - {} (see also: \"{}\", {} disambiguation markers)",
            entry.code,
            entry.see_also,
            entry.disambiguation.len()
        );
        println!("    endpoint: {}", config.api.endpoint(&entry.code));
    }

    println!("\nSeeds ({}):", config.crawler.seeds.len());
    for seed in &config.crawler.seeds {
        println!("  * {}", seed);
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<()> {
    println!("Database: {}\n", config.store.database_path);

    let storage = SqliteStorage::new(Path::new(&config.store.database_path))
        .context("failed to open database")?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str, rounds: Option<u64>) -> Result<()> {
    tracing::info!(
        "Languages: {}, seeds: {}, workers: {}",
        config.tracked_languages().join(", "),
        config.crawler.seeds.len(),
        config.crawler.workers
    );

    let status = run_crawl(config, config_hash, rounds)
        .await
        .context("crawl failed")?;

    match status {
        RunStatus::Interrupted => tracing::warn!("Crawl interrupted"),
        _ => tracing::info!("Crawl finished: {}", status.to_db_string()),
    }
    Ok(())
}
