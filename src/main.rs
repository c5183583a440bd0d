//! GitHub-City main entry point
//!
//! This is the command-line interface for the GitHub-City user ranking crawler.

use anyhow::Context;
use clap::Parser;
use github_city::config::{load_config_with_hash, Config};
use github_city::output::{
    print_statistics, write_all, JsonExporter, MarkdownReport, RankingSummary, SortKey,
};
use github_city::{CityError, Crawler};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// GitHub-City: rank the GitHub users of a location
///
/// GitHub-City finds every user whose profile location matches the configured
/// target, splitting the search by account creation date to get past the
/// search API's result cap, and ranks them by their public activity.
#[derive(Parser, Debug)]
#[command(name = "github-city")]
#[command(version)]
#[command(about = "Rank the GitHub users of a location", long_about = None)]
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

    /// Compute the date partitions again, ignoring the saved ones
    #[arg(long)]
    recompute: bool,

    /// Ranking order (contributions, name, lstreak, cstreak, language,
    /// followers, join, organizations, repositories, stars)
    #[arg(long, value_name = "KEY", default_value = "contributions")]
    sort: SortKey,

    /// Show the target and its partitions without fetching any user
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let mut crawler = Crawler::from_config(&config, cancel).context("Failed to set up the crawler")?;
    crawler.options_mut().recompute = cli.recompute;

    let target = config.search_target()?;
    let exclusions = config.exclusions();

    if cli.dry_run {
        let state = crawler
            .prepare(target, exclusions)
            .await
            .context("Failed to prepare partitions")?;
        print_dry_run(&config, &state);
        return Ok(());
    }

    let outcome = match crawler.run(target, exclusions).await {
        Ok(outcome) => outcome,
        Err(CityError::Cancelled) => {
            tracing::warn!("Interrupted, no results written");
            return Ok(());
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    let summary = RankingSummary::from_outcome(outcome, cli.sort, &config_hash);

    let json = JsonExporter::new(Path::new(&config.output.results_path));
    let markdown = MarkdownReport::new(Path::new(&config.output.summary_path));
    write_all(&[&json, &markdown], &summary).context("Failed to write results")?;

    if !cli.quiet {
        print_statistics(&summary.stats);
        println!();
        println!("✓ Users exported to: {}", config.output.results_path);
        println!("✓ Ranking written to: {}", config.output.summary_path);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("github_city=info,warn"),
            1 => EnvFilter::new("github_city=debug,info"),
            2 => EnvFilter::new("github_city=trace,debug"),
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

/// Cancels the crawl on the first Ctrl-C
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping the crawl");
            cancel.cancel();
        }
    });
}

/// Handles the --dry-run mode: shows the target and its partitions
fn print_dry_run(config: &Config, state: &github_city::CrawlState) {
    println!("=== GitHub-City Dry Run ===\n");

    println!("Target:");
    println!("  Name: {}", state.target().name());
    println!("  Query: {}", state.target().query_fragment());

    println!("\nCrawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Max retries: {}", config.crawler.max_retries);
    println!("  API: {}", config.crawler.api_base_url);

    println!("\nOutput:");
    println!("  State: {}", config.output.state_path);
    println!("  Results: {}", config.output.results_path);
    println!("  Summary: {}", config.output.summary_path);

    let exclusions = state.exclusions();
    println!(
        "\nExclusions: {} users, {} locations",
        exclusions.users().count(),
        exclusions.locations().count()
    );

    println!("\nPartitions ({}):", state.partitions().len());
    for range in state.partitions() {
        println!("  - {}", range);
    }

    match state.last_run() {
        Some(date) => println!("\nLast successful crawl: {}", date),
        None => println!("\nNo successful crawl yet"),
    }
}
