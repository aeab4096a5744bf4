//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The crawl state (pages, link graphs, images) behind one lock
//! - The frontier of URLs waiting to be fetched
//! - HTTP fetching and HTML extraction
//! - The driver that runs a bounded worker pool over the frontier

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod state;

pub use coordinator::{CrawlOutcome, CrawlPhase, CrawlStats, Crawler, HaltHandle, StopReason};
pub use fetcher::{
    build_http_client, DiscoveredImage, FetchError, FetchedPage, HttpFetcher, PageFetcher,
};
pub use frontier::Frontier;
pub use parser::{parse_html, ParsedPage};
pub use state::{CrawlError, CrawlSnapshot, CrawlState};

use crate::config::Config;
use crate::handoff::{PageRepository, SaveReport};
use crate::SpiderError;
use std::sync::Arc;
use std::time::Duration;

/// Totals over all cycles of a run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub cycles: u32,
    pub pages_saved: usize,
    pub pages_skipped: usize,
    pub enqueued: usize,
    pub last_stop: Option<StopReason>,

    /// Frontier left after the last cycle
    pub remaining: Vec<String>,
}

impl RunSummary {
    fn absorb(&mut self, outcome: &CrawlOutcome, report: &SaveReport) {
        self.cycles += 1;
        self.pages_saved += report.written;
        self.pages_skipped += report.skipped.len();
        self.enqueued += report.enqueued;
        self.last_stop = Some(outcome.stop_reason);
    }
}

/// Runs the configured number of crawl and persist cycles
///
/// Each cycle crawls from the frontier the previous one left behind and
/// saves its pages before the next starts. The run ends early when the
/// frontier is used up, the halt handle fires, or (with `wait-for-signal`)
/// no resume signal arrives in time.
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `fetcher` - Fetch-and-extract collaborator shared by all workers
/// * `repository` - Where finished cycles are persisted
/// * `halt` - Stops the run between dispatches
///
/// # Returns
///
/// * `Ok(RunSummary)` - All cycles ran and were persisted
/// * `Err(SpiderError)` - A batch write or the signal wait failed
pub async fn crawl(
    config: &Config,
    fetcher: Arc<dyn PageFetcher>,
    repository: &PageRepository,
    halt: &HaltHandle,
) -> Result<RunSummary, SpiderError> {
    let mut summary = RunSummary::default();
    let mut seeds = config.seeds.urls.clone();

    for cycle in 1..=config.crawler.cycles {
        if cycle > 1 && config.store.wait_for_signal {
            tracing::info!("Cycle {} waiting for resume signal", cycle);
            let timeout = Duration::from_secs(config.store.signal_timeout_secs);
            if !repository.wait_for_resume(timeout).await? {
                tracing::info!("No resume signal within {:?}, stopping", timeout);
                break;
            }
        }

        tracing::info!("Starting cycle {}/{}", cycle, config.crawler.cycles);

        let crawler =
            Crawler::new(&config.crawler, Arc::clone(&fetcher)).with_halt_handle(halt.clone());
        let outcome = crawler.run(&seeds).await;

        // Partial state from a halted cycle is persisted too
        let report = repository.save_all(&outcome.snapshot).await?;
        summary.absorb(&outcome, &report);
        seeds = outcome.remaining;

        if halt.is_halted() {
            tracing::info!("Crawl halted after cycle {}", cycle);
            break;
        }

        if seeds.is_empty() {
            tracing::info!("Frontier exhausted after cycle {}", cycle);
            break;
        }
    }

    summary.remaining = seeds;
    Ok(summary)
}
