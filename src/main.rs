//! Trawler main entry point
//!
//! This is the command-line interface for the Trawler crawler engine.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use trawler::config::{load_config_with_hash, Config};
use trawler::crawler::{CrawlObserver, Crawler};
use trawler::output::{generate_markdown_summary, print_statistics, JsonLinesObserver};
use trawler::partition::Partitioner;
use tracing_subscriber::EnvFilter;

/// Trawler: a policy-respecting web crawler
///
/// Trawler crawls a site from a seed URL while honouring robots.txt and
/// per-domain politeness delays. Interrupted crawls resume from their last
/// checkpoint when the `[state]` section enables it.
#[derive(Parser, Debug)]
#[command(name = "trawler")]
#[command(version = "1.0.0")]
#[command(about = "A policy-respecting web crawler", long_about = None)]
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

    /// Start a fresh crawl, discarding any stored checkpoint
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Worker slot of this process (overrides [distributed] worker-id)
    #[arg(long, requires = "total_workers")]
    worker_id: Option<u32>,

    /// Number of cooperating workers (overrides [distributed] total-workers)
    #[arg(long, requires = "worker_id")]
    total_workers: Option<u32>,

    /// Write crawl events to this JSON-lines file
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Include page bodies in the JSON-lines output
    #[arg(long, requires = "output")]
    include_content: bool,

    /// Write a markdown summary to this file when the crawl ends
    #[arg(long, value_name = "FILE")]
    summary: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let (Some(worker_id), Some(total_workers)) = (cli.worker_id, cli.total_workers) {
        config.distributed.worker_id = worker_id;
        config.distributed.total_workers = total_workers;
    }

    if cli.dry_run {
        return handle_dry_run(config);
    }

    handle_crawl(config, &cli).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` takes precedence when set.
fn setup_logging(verbose: u8, quiet: bool) {
    let default = if quiet {
        "error"
    } else {
        match verbose {
            0 => "trawler=info,warn",
            1 => "trawler=debug,info",
            2 => "trawler=trace,debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: Config) -> anyhow::Result<()> {
    let partitioner = Partitioner::new(
        config.distributed.worker_id,
        config.distributed.total_workers,
    );
    let crawler = Crawler::new(config.clone(), ()).context("invalid configuration")?;

    println!("=== Trawler Dry Run ===\n");
    println!("Seed: {}", crawler.seed());

    println!("\nCrawler Configuration:");
    println!("  Strategy: {:?}", config.crawler.strategy);
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Delay: {}ms", config.crawler.delay_ms);
    println!("  Max concurrent: {}", config.crawler.max_concurrent);
    println!("  User agent: {}", config.crawler.user_agent);

    println!("\nScope:");
    println!("  Stay in domain: {}", config.scope.stay_in_domain);
    println!("  Allowed domains: {:?}", config.scope.allowed_domains);
    println!("  Blocked domains: {:?}", config.scope.blocked_domains);
    println!("  URL patterns: {:?}", config.scope.url_patterns);
    println!("  Exclude patterns: {:?}", config.scope.exclude_patterns);

    println!("\nPolicy:");
    println!("  Respect robots.txt: {}", config.policy.respect_robots_txt);
    println!("  Follow sitemaps: {}", config.policy.follow_sitemaps);

    if partitioner.is_distributed() {
        println!(
            "\nWorker {} of {}",
            partitioner.worker_id(),
            partitioner.total_workers()
        );
    }

    match crawler.identity() {
        Some(identity) => println!(
            "\nCheckpoints: {} ({:?}, identity {})",
            config.state.state_dir, config.state.backend, identity
        ),
        None => println!("\nCheckpoints: disabled"),
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, cli: &Cli) -> anyhow::Result<()> {
    let observer: Box<dyn CrawlObserver> = match &cli.output {
        Some(path) => {
            tracing::info!("Writing crawl events to {}", path.display());
            let sink = JsonLinesObserver::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Box::new(sink.with_content(cli.include_content))
        }
        None => Box::new(()),
    };

    let mut crawler = Crawler::new(config, observer)?.with_fresh_start(cli.fresh);
    let seed = crawler.seed().to_string();

    let stop = crawler.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; stopping crawl");
            stop.stop();
        }
    });

    let stats = match crawler.run().await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    if let Some(path) = &cli.summary {
        generate_markdown_summary(&seed, &stats, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!("Summary written to {}", path.display());
    }

    if !cli.quiet {
        println!();
        print_statistics(&stats);
    }

    Ok(())
}
