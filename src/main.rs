//! Market-Miner main entry point
//!
//! This is the command-line interface for the Market-Miner auction scraper.

use anyhow::{bail, Context};
use clap::Parser;
use market_miner::client::HttpSourceClient;
use market_miner::config::load_config;
use market_miner::output::{write_cross_server_csv, write_items_csv, ConsoleSink};
use market_miner::scrape::{RateLimiter, ScrapeOrchestrator};
use market_miner::storage::{JsonSkipStore, SkipStore};
use market_miner::RunStatus;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Market-Miner: a concurrent auction-house market scraper
///
/// Market-Miner sweeps an item-ID range against an auction-listing site for
/// one or many game servers, honoring a global request-rate ceiling, and
/// writes per-server price records plus cross-server comparisons to CSV.
#[derive(Parser, Debug)]
#[command(name = "market-miner")]
#[command(version = "1.0.0")]
#[command(about = "A concurrent auction-house market scraper", long_about = None)]
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

    /// Override the configured server selection (name or "all")
    #[arg(long, value_name = "NAME")]
    server: Option<String>,

    /// Override the first item ID of the range
    #[arg(long, value_name = "ID")]
    from: Option<u32>,

    /// Override the last item ID of the range
    #[arg(long, value_name = "ID")]
    to: Option<u32>,

    /// Override the number of fetch workers
    #[arg(long, value_name = "N")]
    threads: Option<u32>,

    /// Validate config and show what would be scraped without fetching
    #[arg(long)]
    dry_run: bool,

    /// Delete the persisted skip-cache before scraping
    #[arg(long)]
    clear_skip_cache: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let mut config = load_config(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;

    apply_overrides(&mut config, &cli)?;

    if cli.dry_run {
        handle_dry_run(&config)?;
        return Ok(());
    }

    handle_scrape(config, cli.clear_skip_cache).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("market_miner=info,warn"),
            1 => EnvFilter::new("market_miner=debug,info"),
            2 => EnvFilter::new("market_miner=trace,debug"),
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

/// Applies CLI overrides on top of the loaded configuration
///
/// Overrides are re-validated so a bad flag fails as loudly as a bad config
/// file.
fn apply_overrides(
    config: &mut market_miner::config::Config,
    cli: &Cli,
) -> anyhow::Result<()> {
    if let Some(server) = &cli.server {
        config.scrape.server = server.clone();
    }
    if let Some(from) = cli.from {
        config.scrape.from_id = from;
    }
    if let Some(to) = cli.to {
        config.scrape.to_id = to;
    }
    if let Some(threads) = cli.threads {
        config.scrape.thread_count = threads;
    }

    market_miner::config::validate(config)?;
    Ok(())
}

/// Handles the --dry-run mode: validates config and shows the planned scrape
fn handle_dry_run(
    config: &market_miner::config::Config,
) -> anyhow::Result<()> {
    println!("=== Market-Miner Dry Run ===\n");

    println!("Scrape:");
    println!("  Server selection: {}", config.scrape.server);
    println!(
        "  Item range: {}..={} ({} items)",
        config.scrape.from_id,
        config.scrape.to_id,
        config.range_len()
    );
    println!("  Workers: {}", config.scrape.thread_count);
    println!(
        "  Rate limit: {} req/s (shared across workers)",
        config.scrape.rate_limit_per_sec
    );
    println!(
        "  Retries: up to {} attempts, backoff {}ms..{}ms",
        config.scrape.retry_ceiling, config.scrape.backoff_base_ms, config.scrape.backoff_cap_ms
    );

    println!("\nSource:");
    println!("  Base URL: {}", config.source.base_url);
    println!("  Timeout: {}s", config.source.timeout_secs);

    println!("\nOutput:");
    println!("  Items CSV: {}", config.output.items_path);
    println!("  Cross-server CSV: {}", config.output.cross_server_path);
    println!("  Skip-cache: {}", config.output.skip_cache_path);

    let servers = config.selected_servers();
    println!("\nSelected servers ({}):", servers.len());
    for server in &servers {
        println!("  - {} (sid {})", server.name, server.sid);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would fetch up to {} items across {} server(s)",
        config.range_len() * servers.len() as u64,
        servers.len()
    );

    Ok(())
}

/// Handles the main scrape operation
async fn handle_scrape(
    config: market_miner::config::Config,
    clear_skip_cache: bool,
) -> anyhow::Result<()> {
    let store = JsonSkipStore::new(&config.output.skip_cache_path);
    if clear_skip_cache {
        tracing::info!("Clearing skip-cache at {}", store.path().display());
        store.clear()?;
    }

    // One limiter covers item fetches and stack-variant fetches alike, so
    // the configured ceiling bounds every request sent to the source.
    let limiter = Arc::new(RateLimiter::new(config.scrape.rate_limit_per_sec));
    let client = HttpSourceClient::new(&config.source)?.with_limiter(Arc::clone(&limiter));

    let output = config.output.clone();
    let orchestrator = ScrapeOrchestrator::new(
        config,
        Arc::new(client),
        Arc::new(store),
        Arc::new(ConsoleSink::new()),
    )
    .with_limiter(limiter);

    // Ctrl-C requests a graceful stop; partial results are still written.
    let cancel = orchestrator.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after in-flight fetches");
            cancel.cancel();
        }
    });

    let started = std::time::Instant::now();
    let outcome = orchestrator.run().await?;

    let mut records = Vec::new();
    for result in &outcome.per_server {
        records.extend(result.records.values().cloned());
    }

    if !records.is_empty() {
        let total = write_items_csv(&output.items_path, &records)?;
        tracing::info!(
            "Saved {} rows ({} total) to {}",
            records.len(),
            total,
            output.items_path
        );
    }

    if !outcome.cross_server.is_empty() {
        write_cross_server_csv(&output.cross_server_path, &outcome.cross_server)?;
        tracing::info!(
            "Saved {} price comparisons to {}",
            outcome.cross_server.len(),
            output.cross_server_path
        );
    }

    tracing::info!(
        "Scrape {} in {:.1}s: {} records across {} server run(s)",
        outcome.status,
        started.elapsed().as_secs_f64(),
        records.len(),
        outcome.per_server.len()
    );

    match outcome.status {
        RunStatus::Completed => Ok(()),
        RunStatus::Cancelled => {
            tracing::warn!("Scrape cancelled; partial results written");
            Ok(())
        }
        RunStatus::Failed => {
            tracing::error!("Scrape aborted: source unreachable");
            bail!("scrape aborted after repeated source failures")
        }
    }
}
