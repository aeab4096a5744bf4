//! Crawl frontier
//!
//! A FIFO of URLs waiting to be fetched, shared by the driver and the
//! workers. It has its own lock, independent of the crawl state, and
//! remembers every URL it ever accepted so nothing is queued twice.

use crate::url::{is_valid_url, normalize_url};
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct FrontierInner {
    queue: VecDeque<String>,
    seen: HashSet<String>,
}

/// Concurrency-safe queue of discovered-but-unfetched URLs
#[derive(Debug, Default)]
pub struct Frontier {
    inner: Mutex<FrontierInner>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FrontierInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Computes the dedup key for `raw`, or None if it cannot be crawled
    pub fn key_for(raw: &str) -> Option<String> {
        if !is_valid_url(raw) {
            return None;
        }
        normalize_url(raw).ok()
    }

    /// Queues `raw` unless a URL with the same key was queued before
    ///
    /// Returns true if the URL was added.
    pub fn push(&self, raw: &str) -> bool {
        match Self::key_for(raw) {
            Some(key) => self.push_keyed(raw, key),
            None => false,
        }
    }

    /// Queues `raw` under an already computed key
    pub fn push_keyed(&self, raw: &str, key: String) -> bool {
        let mut inner = self.lock();
        if !inner.seen.insert(key) {
            return false;
        }
        inner.queue.push_back(raw.trim().to_string());
        true
    }

    pub fn pop(&self) -> Option<String> {
        self.lock().queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Removes and returns every URL still waiting
    pub fn drain(&self) -> Vec<String> {
        self.lock().queue.drain(..).collect()
    }
}
