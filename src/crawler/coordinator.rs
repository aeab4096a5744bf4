//! Crawler coordinator - the crawl driver
//!
//! The driver owns the crawl state for the lifetime of one crawl cycle and
//! walks it through an explicit state machine:
//!
//! ```text
//! Idle ──run()──▶ Running ──capacity / empty frontier / halt──▶ Draining ──last worker──▶ Done
//! ```
//!
//! While running, it dispatches one worker per frontier URL, never more than
//! `max_concurrency` at once (a semaphore slot per worker). Workers feed newly
//! discovered links back into the frontier. The frontier counts as exhausted
//! only when it is empty *and* no worker is in flight.

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::{FetchedPage, PageFetcher};
use crate::crawler::frontier::Frontier;
use crate::crawler::state::{CrawlError, CrawlSnapshot, CrawlState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};

/// Lifecycle of a crawl cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    /// Created, nothing dispatched yet
    Idle,
    /// Dispatching workers
    Running,
    /// No new dispatches; waiting for in-flight workers
    Draining,
    /// All workers finished; the state is frozen
    Done,
}

/// Why the driver stopped dispatching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    CapacityReached,
    FrontierExhausted,
    Halted,
}

/// What a single worker did with its URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerOutcome {
    Added { queued: usize },
    Duplicate,
    OverCapacity,
    Failed,
}

/// Counters for one crawl cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub dispatched: usize,
    pub added: usize,
    pub links_queued: usize,
    pub duplicates: usize,
    pub over_capacity: usize,
    pub failed: usize,
    pub panicked: usize,
}

impl CrawlStats {
    fn record(&mut self, result: Result<WorkerOutcome, JoinError>) {
        match result {
            Ok(WorkerOutcome::Added { queued }) => {
                self.added += 1;
                self.links_queued += queued;
            }
            Ok(WorkerOutcome::Duplicate) => self.duplicates += 1,
            Ok(WorkerOutcome::OverCapacity) => self.over_capacity += 1,
            Ok(WorkerOutcome::Failed) => self.failed += 1,
            Err(e) => {
                tracing::error!("Crawl worker aborted: {}", e);
                self.panicked += 1;
            }
        }
    }
}

/// Result of a finished crawl cycle
#[derive(Debug)]
pub struct CrawlOutcome {
    /// Frozen crawl state, ready for persistence
    pub snapshot: CrawlSnapshot,

    /// URLs queued but never fetched; seeds for a following cycle
    pub remaining: Vec<String>,

    pub stop_reason: StopReason,
    pub stats: CrawlStats,
}

/// Stops a running crawl between dispatches
///
/// In-flight workers always finish their current fetch.
#[derive(Debug, Clone, Default)]
pub struct HaltHandle {
    flag: Arc<AtomicBool>,
}

impl HaltHandle {
    pub fn halt(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_halted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Main crawler driver
pub struct Crawler<F: ?Sized> {
    fetcher: Arc<F>,
    state: Arc<CrawlState>,
    frontier: Arc<Frontier>,
    slots: Arc<Semaphore>,
    fetch_timeout: Duration,
    phase: watch::Sender<CrawlPhase>,
    halt: HaltHandle,
}

impl<F> Crawler<F>
where
    F: PageFetcher + ?Sized + 'static,
{
    /// Creates a driver with empty state bounded by `config`
    ///
    /// A concurrency of zero is raised to one; with no slots the driver
    /// could never dispatch.
    pub fn new(config: &CrawlerConfig, fetcher: Arc<F>) -> Self {
        let (phase, _) = watch::channel(CrawlPhase::Idle);
        let max_concurrency = config.max_concurrency.max(1);

        Self {
            fetcher,
            state: Arc::new(CrawlState::new(config.max_pages, max_concurrency)),
            frontier: Arc::new(Frontier::new()),
            slots: Arc::new(Semaphore::new(max_concurrency)),
            fetch_timeout: Duration::from_millis(config.fetch_timeout_ms),
            phase,
            halt: HaltHandle::default(),
        }
    }

    /// Shares an existing halt handle, e.g. one wired to Ctrl-C
    pub fn with_halt_handle(mut self, halt: HaltHandle) -> Self {
        self.halt = halt;
        self
    }

    pub fn halt_handle(&self) -> HaltHandle {
        self.halt.clone()
    }

    /// Subscribes to phase transitions
    pub fn watch_phase(&self) -> watch::Receiver<CrawlPhase> {
        self.phase.subscribe()
    }

    pub fn phase(&self) -> CrawlPhase {
        *self.phase.borrow()
    }

    /// Shared view of the crawl state
    pub fn state(&self) -> Arc<CrawlState> {
        Arc::clone(&self.state)
    }

    fn transition(&self, next: CrawlPhase) {
        let previous = self.phase.send_replace(next);
        tracing::debug!("Crawl phase {:?} -> {:?}", previous, next);
    }

    /// Runs the crawl from `seeds` until capacity, exhaustion or halt
    ///
    /// Consumes the driver and returns the frozen state together with the
    /// URLs that were still waiting in the frontier.
    pub async fn run(self, seeds: &[String]) -> CrawlOutcome {
        let started = Instant::now();

        for seed in seeds {
            if !self.frontier.push(seed) {
                tracing::warn!("Ignoring unusable or duplicate seed {}", seed);
            }
        }

        tracing::info!(
            "Starting crawl: {} seeds, max {} pages, {} workers",
            self.frontier.len(),
            self.state.max_pages(),
            self.state.max_concurrency()
        );

        self.transition(CrawlPhase::Running);

        let mut workers: JoinSet<WorkerOutcome> = JoinSet::new();
        let mut stats = CrawlStats::default();

        let stop_reason = loop {
            let slot = match Arc::clone(&self.slots).acquire_owned().await {
                Ok(slot) => slot,
                Err(_) => break StopReason::Halted,
            };

            if self.halt.is_halted() {
                break StopReason::Halted;
            }

            if self.state.capacity_reached() {
                break StopReason::CapacityReached;
            }

            let Some(url) = self.frontier.pop() else {
                drop(slot);
                // An in-flight worker may still grow the frontier
                match workers.join_next().await {
                    Some(result) => {
                        stats.record(result);
                        continue;
                    }
                    None => break StopReason::FrontierExhausted,
                }
            };

            stats.dispatched += 1;
            workers.spawn(crawl_url(
                url,
                Arc::clone(&self.fetcher),
                Arc::clone(&self.state),
                Arc::clone(&self.frontier),
                self.fetch_timeout,
                slot,
            ));

            while let Some(result) = workers.try_join_next() {
                stats.record(result);
            }
        };

        self.transition(CrawlPhase::Draining);
        tracing::info!(
            "Crawl stopping ({:?}), waiting for {} in-flight workers",
            stop_reason,
            workers.len()
        );

        while let Some(result) = workers.join_next().await {
            stats.record(result);
        }

        self.transition(CrawlPhase::Done);

        let remaining = self.frontier.drain();
        let snapshot = match Arc::try_unwrap(self.state) {
            Ok(state) => state.into_snapshot(),
            Err(shared) => shared.snapshot(),
        };

        tracing::info!(
            "Crawl done in {:?}: {} pages, {} dispatched, {} failed, {} left in frontier",
            started.elapsed(),
            snapshot.pages.len(),
            stats.dispatched,
            stats.failed,
            remaining.len()
        );

        CrawlOutcome {
            snapshot,
            remaining,
            stop_reason,
            stats,
        }
    }
}

/// Fetches one URL, records it, and queues its unvisited links
async fn crawl_url<F>(
    url: String,
    fetcher: Arc<F>,
    state: Arc<CrawlState>,
    frontier: Arc<Frontier>,
    fetch_timeout: Duration,
    _slot: OwnedSemaphorePermit,
) -> WorkerOutcome
where
    F: PageFetcher + ?Sized,
{
    let fetched = match tokio::time::timeout(fetch_timeout, fetcher.fetch_and_extract(&url)).await
    {
        Ok(Ok(fetched)) => fetched,
        Ok(Err(e)) => {
            tracing::warn!("Failed to fetch {}: {}", url, e);
            return WorkerOutcome::Failed;
        }
        Err(_) => {
            tracing::warn!("Fetch of {} exceeded {:?}", url, fetch_timeout);
            return WorkerOutcome::Failed;
        }
    };

    let FetchedPage {
        page,
        links,
        images,
    } = fetched;
    let normalized = page.normalized_url().to_string();

    match state.commit_page(page, &links, &images) {
        Ok(()) => {}
        Err(CrawlError::AlreadyVisited(_)) => {
            tracing::debug!("Already visited {}, dropping", normalized);
            return WorkerOutcome::Duplicate;
        }
        Err(CrawlError::CapacityExceeded { .. }) => {
            tracing::debug!("Capacity reached, dropping {}", normalized);
            return WorkerOutcome::OverCapacity;
        }
    }

    if state.capacity_reached() {
        return WorkerOutcome::Added { queued: 0 };
    }

    let mut queued = 0;
    for link in &links {
        let Some(key) = Frontier::key_for(link) else {
            continue;
        };
        if key == normalized || state.is_visited(&key) {
            continue;
        }
        if frontier.push_keyed(link, key) {
            queued += 1;
        }
    }

    tracing::debug!(
        "Crawled {} ({}/{} pages, {} links queued)",
        normalized,
        state.size(),
        state.max_pages(),
        queued
    );

    WorkerOutcome::Added { queued }
}
