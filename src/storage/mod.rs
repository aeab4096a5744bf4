//! Storage module for handing crawled pages to the indexing stage
//!
//! This module defines the abstract key-value/queue store and its backends:
//! - `RedisStore`: the production store shared with the indexers
//! - `SqliteStore`: an embedded single-file store
//! - `MemoryStore`: in-process store for tests and dry runs
//!
//! Writes are staged in a `WriteBatch` and submitted in one round trip so the
//! backend can be swapped without touching crawl logic.

mod batch;
mod memory;
mod redis_store;
mod schema;
mod sqlite;
mod traits;

pub use batch::{StagedWrite, WriteBatch};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use sqlite::SqliteStore;
pub use traits::{PageStore, StoreError, StoreResult};

use crate::config::{StoreBackend, StoreConfig};
use std::path::Path;
use std::sync::Arc;

/// Opens the store selected by the configuration
///
/// # Returns
///
/// * `Ok(Arc<dyn PageStore>)` - A connected store
/// * `Err(StoreError)` - The backend could not be reached or opened
pub async fn open_store(config: &StoreConfig) -> StoreResult<Arc<dyn PageStore>> {
    let store: Arc<dyn PageStore> = match config.backend {
        StoreBackend::Redis => Arc::new(RedisStore::connect(&config.redis_url).await?),
        StoreBackend::Sqlite => Arc::new(SqliteStore::new(Path::new(&config.database_path))?),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}
