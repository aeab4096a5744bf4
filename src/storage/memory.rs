//! In-process store implementation
//!
//! Backs `backend = "memory"` runs and the test suite. Every operation takes
//! one mutex, so a submitted batch becomes visible all at once.

use crate::pages::PageHash;
use crate::storage::traits::{PageStore, StoreError, StoreResult};
use crate::storage::{StagedWrite, WriteBatch};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct Inner {
    hashes: HashMap<String, PageHash>,
    sets: HashMap<String, BTreeSet<String>>,
    queues: HashMap<String, VecDeque<String>>,
    submitted_batches: usize,
}

/// Store kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    /// Returns a copy of the hash stored under `key`
    pub fn hash(&self, key: &str) -> Option<PageHash> {
        self.lock().ok()?.hashes.get(key).cloned()
    }

    /// Returns the sorted members of the set stored under `key`
    pub fn set_members(&self, key: &str) -> Vec<String> {
        self.lock()
            .ok()
            .and_then(|inner| inner.sets.get(key).map(|s| s.iter().cloned().collect()))
            .unwrap_or_default()
    }

    /// Returns the pending entries of `queue`, oldest first
    pub fn queue(&self, queue: &str) -> Vec<String> {
        self.lock()
            .ok()
            .and_then(|inner| inner.queues.get(queue).map(|q| q.iter().cloned().collect()))
            .unwrap_or_default()
    }

    /// Number of batches submitted so far
    pub fn submitted_batches(&self) -> usize {
        self.lock().map(|inner| inner.submitted_batches).unwrap_or(0)
    }
}

#[async_trait]
impl PageStore for MemoryStore {
    async fn list_keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let inner = self.lock()?;
        let mut keys: Vec<String> = inner
            .hashes
            .keys()
            .chain(inner.sets.keys())
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn batch_get_hash(&self, keys: &[String]) -> StoreResult<Vec<PageHash>> {
        let inner = self.lock()?;
        Ok(keys
            .iter()
            .map(|k| inner.hashes.get(k).cloned().unwrap_or_default())
            .collect())
    }

    async fn submit(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut inner = self.lock()?;
        for write in batch.into_writes() {
            match write {
                StagedWrite::Hash { key, fields } => {
                    inner.hashes.entry(key).or_default().extend(fields);
                }
                StagedWrite::SetMembers { key, members } => {
                    inner.sets.entry(key).or_default().extend(members);
                }
            }
        }
        inner.submitted_batches += 1;
        Ok(())
    }

    async fn push(&self, queue: &str, value: &str) -> StoreResult<()> {
        self.lock()?
            .queues
            .entry(queue.to_string())
            .or_default()
            .push_back(value.to_string());
        Ok(())
    }

    async fn wait_pop(&self, queue: &str, timeout: Duration) -> StoreResult<Option<String>> {
        let deadline = Instant::now() + timeout;
        loop {
            let popped = self
                .lock()?
                .queues
                .get_mut(queue)
                .and_then(VecDeque::pop_front);
            if popped.is_some() {
                return Ok(popped);
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}
