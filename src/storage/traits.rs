//! Storage traits and error types
//!
//! This module defines the store interface consumed by the handoff layer
//! and its error type.

use crate::pages::PageHash;
use crate::storage::WriteBatch;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A pipelined/batched submission failed as a whole
    #[error("Batch of {operations} operations failed: {reason}")]
    Batch { operations: usize, reason: String },

    #[error("Store connection unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value and queue operations needed by the crawler handoff
///
/// Implementations must be safe to share between tasks. Batched reads and
/// writes are all-or-nothing from the caller's perspective: any transport
/// failure fails the whole call.
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Lists all keys beginning with `prefix`
    async fn list_keys(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// Reads every hash in `keys` in one round trip
    ///
    /// The result is aligned with `keys`; a missing key yields an empty map.
    async fn batch_get_hash(&self, keys: &[String]) -> StoreResult<Vec<PageHash>>;

    /// Submits all staged writes in one round trip
    async fn submit(&self, batch: WriteBatch) -> StoreResult<()>;

    /// Appends `value` to the named work queue
    async fn push(&self, queue: &str, value: &str) -> StoreResult<()>;

    /// Blocks until a value is available on `queue` or `timeout` elapses
    async fn wait_pop(&self, queue: &str, timeout: Duration) -> StoreResult<Option<String>>;
}
