//! Link-Spider main entry point
//!
//! This is the command-line interface for the Link-Spider crawler.

use anyhow::Context;
use clap::Parser;
use link_spider::config::{load_config_with_hash, Config};
use link_spider::crawler::{crawl, HaltHandle, HttpFetcher, PageFetcher};
use link_spider::handoff::PageRepository;
use link_spider::storage::open_store;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Link-Spider: the crawling stage of a search pipeline
///
/// Link-Spider crawls outward from a set of seed URLs up to a page bound,
/// records the link graph and images it finds, and hands every page to the
/// indexers through a shared store and work queue.
#[derive(Parser, Debug)]
#[command(name = "link-spider")]
#[command(version = "1.0.0")]
#[command(about = "A bounded link-graph crawler", long_about = None)]
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
    #[arg(long, conflicts_with = "inspect")]
    dry_run: bool,

    /// List the pages currently in the store and exit
    #[arg(long, conflicts_with = "dry_run")]
    inspect: bool,

    /// Override the number of crawl cycles
    #[arg(long, value_name = "N")]
    cycles: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(cycles) = cli.cycles {
        anyhow::ensure!(cycles >= 1, "--cycles must be at least 1");
        config.crawler.cycles = cycles;
    }

    if cli.dry_run {
        handle_dry_run(&config);
        Ok(())
    } else if cli.inspect {
        handle_inspect(&config).await
    } else {
        handle_crawl(config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("link_spider=info,warn"),
            1 => EnvFilter::new("link_spider=debug,info"),
            2 => EnvFilter::new("link_spider=trace,debug"),
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

/// Handles the --dry-run mode: shows the resolved configuration
fn handle_dry_run(config: &Config) {
    println!("=== Link-Spider Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Max concurrency: {}", config.crawler.max_concurrency);
    println!("  Fetch timeout: {}ms", config.crawler.fetch_timeout_ms);
    println!("  Cycles: {}", config.crawler.cycles);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nStore:");
    println!("  Backend: {:?}", config.store.backend);
    println!("  Redis: {}", config.store.redis_url);
    println!("  Database: {}", config.store.database_path);
    println!("  Page prefix: {}", config.store.page_prefix);
    println!(
        "  Queues: {} (pages), {} (images), {} (signals)",
        config.store.indexer_queue, config.store.image_indexer_queue, config.store.signal_queue
    );
    if config.store.wait_for_signal {
        println!(
            "  Waits up to {}s for a resume signal between cycles",
            config.store.signal_timeout_secs
        );
    }

    println!("\nSeeds ({}):", config.seeds.urls.len());
    for seed in &config.seeds.urls {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --inspect mode: lists stored pages
async fn handle_inspect(config: &Config) -> anyhow::Result<()> {
    let store = open_store(&config.store)
        .await
        .context("Failed to open store")?;
    let repository = PageRepository::new(store, &config.store);

    let pages = repository
        .fetch_all()
        .await
        .context("Failed to read stored pages")?;

    let mut urls: Vec<&String> = pages.keys().collect();
    urls.sort();

    println!("{} stored pages\n", pages.len());
    for url in urls {
        let page = &pages[url];
        println!(
            "  {}  [{}]  {}",
            url,
            page.last_crawled.format("%Y-%m-%d %H:%M:%S"),
            page.title
        );
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Seeds: {}, page bound: {}, cycles: {}",
        config.seeds.urls.len(),
        config.crawler.max_pages,
        config.crawler.cycles
    );

    let store = open_store(&config.store)
        .await
        .with_context(|| format!("Failed to open {:?} store", config.store.backend))?;
    let repository = PageRepository::new(store, &config.store);

    let fetcher: Arc<dyn PageFetcher> = Arc::new(
        HttpFetcher::from_config(
            &config.user_agent,
            Duration::from_millis(config.crawler.fetch_timeout_ms),
        )
        .context("Failed to build HTTP client")?,
    );

    let halt = HaltHandle::default();
    let ctrl_c = halt.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight pages");
            ctrl_c.halt();
        }
    });

    let summary = crawl(&config, fetcher, &repository, &halt)
        .await
        .context("Crawl failed")?;

    tracing::info!(
        "Crawl completed: {} cycles, {} pages saved, {} skipped, {} queued, {} URLs left unvisited",
        summary.cycles,
        summary.pages_saved,
        summary.pages_skipped,
        summary.enqueued,
        summary.remaining.len()
    );

    Ok(())
}
