//! Hand-off between the crawler and the indexing stage
//!
//! Crawl results are persisted as flat hash records under
//! `<prefix>:<normalized url>` keys; the page keys are then pushed onto the
//! indexer work queue. The indexers answer on the signal queue when they
//! want another crawl cycle.

mod keys;
mod repository;

pub use keys::KeySpace;
pub use repository::{PageRepository, SaveReport};

/// Token the indexers push onto the signal queue to request a new cycle
pub const RESUME_SIGNAL: &str = "RESUME_CRAWL";
