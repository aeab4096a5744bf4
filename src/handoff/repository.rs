//! Page repository
//!
//! Reads and writes whole crawl results through a [`PageStore`]. Writes go
//! out as one staged batch; queue notifications follow only once that batch
//! was accepted, and each push stands alone (no retry, no rollback).

use crate::config::StoreConfig;
use crate::crawler::CrawlSnapshot;
use crate::handoff::keys::KeySpace;
use crate::handoff::RESUME_SIGNAL;
use crate::pages::Page;
use crate::storage::{PageStore, StoreResult, WriteBatch};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// What a `save_all` call did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    /// Pages written in the batch
    pub written: usize,

    /// Normalized URLs of pages that failed to serialize
    pub skipped: Vec<String>,

    /// Successful queue pushes (pages and image sets)
    pub enqueued: usize,

    /// Queue pushes that failed
    pub enqueue_failures: usize,
}

/// Persistence and hand-off of crawled pages
pub struct PageRepository {
    store: Arc<dyn PageStore>,
    keys: KeySpace,
    indexer_queue: String,
    image_indexer_queue: String,
    signal_queue: String,
}

impl PageRepository {
    pub fn new(store: Arc<dyn PageStore>, config: &StoreConfig) -> Self {
        Self {
            store,
            keys: KeySpace::from_config(config),
            indexer_queue: config.indexer_queue.clone(),
            image_indexer_queue: config.image_indexer_queue.clone(),
            signal_queue: config.signal_queue.clone(),
        }
    }

    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    /// Loads every stored page, keyed by normalized URL
    ///
    /// Records that do not deserialize are skipped. A failed key listing or
    /// batch read fails the whole call; no partial result is returned.
    pub async fn fetch_all(&self) -> StoreResult<HashMap<String, Page>> {
        let keys = self
            .store
            .list_keys(&self.keys.page_pattern())
            .await
            .map_err(|e| {
                tracing::error!("Failed to list page keys: {}", e);
                e
            })?;

        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let records = self.store.batch_get_hash(&keys).await.map_err(|e| {
            tracing::error!("Batch read of {} pages failed: {}", keys.len(), e);
            e
        })?;

        let mut pages = HashMap::with_capacity(keys.len());
        for (key, record) in keys.iter().zip(records) {
            if record.is_empty() {
                tracing::debug!("Page record {} vanished before it was read", key);
                continue;
            }

            match Page::from_record(&record) {
                Ok(page) => {
                    pages.insert(page.normalized_url().to_string(), page);
                }
                Err(e) => tracing::warn!("Skipping stored record {}: {}", key, e),
            }
        }

        tracing::info!("Loaded {} of {} stored pages", pages.len(), keys.len());
        Ok(pages)
    }

    /// Persists a finished crawl and notifies the indexers
    ///
    /// Pages that fail to serialize are skipped and reported. Everything
    /// else (page hashes, both link graphs, image records) is written in a
    /// single batch. Only if the batch succeeds are the page keys pushed to
    /// the indexer queue and the image-set keys to the image indexer queue.
    pub async fn save_all(&self, snapshot: &CrawlSnapshot) -> StoreResult<SaveReport> {
        let mut report = SaveReport::default();
        let mut batch = WriteBatch::new();
        let mut page_keys = Vec::new();
        let mut image_keys = Vec::new();

        let mut urls: Vec<&String> = snapshot.pages.keys().collect();
        urls.sort();

        for url in urls {
            let page = &snapshot.pages[url];
            let record = match page.to_record() {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("Skipping page: {}", e);
                    report.skipped.push(url.clone());
                    continue;
                }
            };

            let key = self.keys.page(url);
            batch.stage_hash(key.clone(), record);
            page_keys.push(key);

            if let Some(node) = snapshot.outlinks.get(url) {
                batch.stage_set(self.keys.outlinks(url), node.links());
            }

            if let Some(images) = snapshot.images.get(url).filter(|i| !i.is_empty()) {
                let mut sources = Vec::with_capacity(images.len());
                for image in images {
                    let src = &image.normalized_source_url;
                    if sources.contains(src) {
                        continue;
                    }
                    batch.stage_hash(self.keys.image(src), image.to_record());
                    sources.push(src.clone());
                }
                let set_key = self.keys.page_images(url);
                batch.stage_set(set_key.clone(), &sources);
                image_keys.push(set_key);
            }
        }

        // Backlinks may point at pages that were never fetched
        let mut targets: Vec<&String> = snapshot.backlinks.keys().collect();
        targets.sort();
        for target in targets {
            batch.stage_set(self.keys.backlinks(target), snapshot.backlinks[target].links());
        }

        if batch.is_empty() {
            tracing::info!("Nothing to save");
            return Ok(report);
        }

        let operations = batch.len();
        if let Err(e) = self.store.submit(batch).await {
            tracing::error!("Saving {} pages failed: {}", page_keys.len(), e);
            return Err(e);
        }
        report.written = page_keys.len();

        for key in &page_keys {
            self.enqueue(&self.indexer_queue, key, &mut report).await;
        }
        for key in &image_keys {
            self.enqueue(&self.image_indexer_queue, key, &mut report).await;
        }

        tracing::info!(
            "Saved {} pages ({} writes, {} skipped), {} queued for indexing",
            report.written,
            operations,
            report.skipped.len(),
            report.enqueued
        );

        Ok(report)
    }

    async fn enqueue(&self, queue: &str, key: &str, report: &mut SaveReport) {
        match self.store.push(queue, key).await {
            Ok(()) => report.enqueued += 1,
            Err(e) => {
                tracing::warn!("Failed to queue {} on {}: {}", key, queue, e);
                report.enqueue_failures += 1;
            }
        }
    }

    /// Waits for the indexers to ask for another crawl cycle
    ///
    /// Returns false if no resume signal arrived within `timeout`. Other
    /// values on the signal queue are consumed and ignored.
    pub async fn wait_for_resume(&self, timeout: Duration) -> StoreResult<bool> {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(false);
            }

            match self.store.wait_pop(&self.signal_queue, remaining).await? {
                Some(signal) if signal == RESUME_SIGNAL => {
                    tracing::info!("Received resume signal");
                    return Ok(true);
                }
                Some(other) => {
                    tracing::warn!("Ignoring unknown signal '{}' on {}", other, self.signal_queue)
                }
                None => return Ok(false),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{CrawlState, DiscoveredImage};
    use crate::pages::PageHash;
    use crate::storage::{MemoryStore, StoreError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn page(key: &str) -> Page {
        Page::new(format!("https://{}/", key), key)
            .with_title(key)
            .with_content("text")
    }

    fn repository(store: Arc<MemoryStore>) -> PageRepository {
        PageRepository::new(store, &StoreConfig::default())
    }

    fn snapshot_of(pages: Vec<Page>) -> CrawlSnapshot {
        let mut snapshot = CrawlSnapshot::default();
        for page in pages {
            snapshot.pages.insert(page.normalized_url().to_string(), page);
        }
        snapshot
    }

    /// Store whose reads or writes can be made to fail
    #[derive(Default)]
    struct FailingStore {
        inner: MemoryStore,
        fail_reads: bool,
        fail_submit: bool,
        fail_push: bool,
        pushes: AtomicUsize,
    }

    #[async_trait]
    impl PageStore for FailingStore {
        async fn list_keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
            self.inner.list_keys(prefix).await
        }

        async fn batch_get_hash(&self, keys: &[String]) -> StoreResult<Vec<PageHash>> {
            if self.fail_reads {
                return Err(StoreError::Batch {
                    operations: keys.len(),
                    reason: "connection reset".to_string(),
                });
            }
            self.inner.batch_get_hash(keys).await
        }

        async fn submit(&self, batch: WriteBatch) -> StoreResult<()> {
            if self.fail_submit {
                return Err(StoreError::Batch {
                    operations: batch.len(),
                    reason: "connection reset".to_string(),
                });
            }
            self.inner.submit(batch).await
        }

        async fn push(&self, queue: &str, value: &str) -> StoreResult<()> {
            self.pushes.fetch_add(1, Ordering::SeqCst);
            if self.fail_push {
                return Err(StoreError::Unavailable("queue down".to_string()));
            }
            self.inner.push(queue, value).await
        }

        async fn wait_pop(&self, queue: &str, timeout: Duration) -> StoreResult<Option<String>> {
            self.inner.wait_pop(queue, timeout).await
        }
    }

    #[tokio::test]
    async fn test_save_skips_unserializable_page() {
        let store = Arc::new(MemoryStore::new());
        let repo = repository(Arc::clone(&store));

        let mut broken = page("b.com");
        broken.url = "not an absolute url".to_string();
        let snapshot = snapshot_of(vec![page("a.com"), broken, page("c.com")]);

        let report = repo.save_all(&snapshot).await.unwrap();

        assert_eq!(report.written, 2);
        assert_eq!(report.skipped, vec!["b.com".to_string()]);
        assert_eq!(store.submitted_batches(), 1);
        assert!(store.hash("page:a.com").is_some());
        assert!(store.hash("page:b.com").is_none());
        assert!(store.hash("page:c.com").is_some());
        assert_eq!(store.queue("pages_queue"), vec!["page:a.com", "page:c.com"]);
    }

    #[tokio::test]
    async fn test_save_writes_graph_and_images() {
        let state = CrawlState::new(10, 1);
        state
            .commit_page(
                page("a.com"),
                &["https://b.com/".to_string()],
                &[
                    DiscoveredImage::new("https://a.com/1.png", Some("one")),
                    DiscoveredImage::new("https://a.com/2.png", None),
                ],
            )
            .unwrap();

        let store = Arc::new(MemoryStore::new());
        let repo = repository(Arc::clone(&store));
        let report = repo.save_all(&state.into_snapshot()).await.unwrap();

        assert_eq!(store.set_members("outlinks:a.com"), vec!["b.com"]);
        assert_eq!(store.set_members("backlinks:b.com"), vec!["a.com"]);
        assert_eq!(
            store.set_members("page_images:a.com"),
            vec!["https://a.com/1.png", "https://a.com/2.png"]
        );

        // Every member of the image set resolves to an image hash
        for src in store.set_members("page_images:a.com") {
            let image = store.hash(&format!("image:{}", src)).unwrap();
            assert_eq!(image["src"], src);
            assert_eq!(image["page_url"], "a.com");
        }
        assert_eq!(store.hash("image:https://a.com/1.png").unwrap()["alt"], "one");
        assert_eq!(store.hash("image:https://a.com/2.png").unwrap()["alt"], "");

        assert_eq!(store.queue("images_queue"), vec!["page_images:a.com"]);
        assert_eq!(report.enqueued, 2);
    }

    #[tokio::test]
    async fn test_page_with_encoded_query_is_saved() {
        let url = "https://a.com/search?q=hello+world";
        let key = crate::url::normalize_url(url).unwrap();
        let state = CrawlState::new(10, 1);
        state.commit_page(Page::new(url, key.as_str()), &[], &[]).unwrap();

        let store = Arc::new(MemoryStore::new());
        let repo = repository(Arc::clone(&store));
        let report = repo.save_all(&state.into_snapshot()).await.unwrap();

        assert_eq!(report.written, 1);
        assert!(report.skipped.is_empty());
        assert_eq!(store.queue("pages_queue"), vec![format!("page:{}", key)]);
        assert!(repo.fetch_all().await.unwrap().contains_key(&key));
    }

    #[tokio::test]
    async fn test_failed_batch_pushes_nothing() {
        let store = Arc::new(FailingStore {
            fail_submit: true,
            ..FailingStore::default()
        });
        let repo = PageRepository::new(Arc::clone(&store) as Arc<dyn PageStore>, &StoreConfig::default());

        let result = repo.save_all(&snapshot_of(vec![page("a.com")])).await;

        assert!(matches!(result, Err(StoreError::Batch { .. })));
        assert_eq!(store.pushes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_push_failures_do_not_fail_save() {
        let store = Arc::new(FailingStore {
            fail_push: true,
            ..FailingStore::default()
        });
        let repo = PageRepository::new(Arc::clone(&store) as Arc<dyn PageStore>, &StoreConfig::default());

        let report = repo
            .save_all(&snapshot_of(vec![page("a.com"), page("b.com")]))
            .await
            .unwrap();

        assert_eq!(report.written, 2);
        assert_eq!(report.enqueue_failures, 2);
        assert_eq!(store.pushes.load(Ordering::SeqCst), 2);
        assert!(store.inner.hash("page:a.com").is_some());
    }

    #[tokio::test]
    async fn test_empty_snapshot_submits_nothing() {
        let store = Arc::new(MemoryStore::new());
        let repo = repository(Arc::clone(&store));

        let report = repo.save_all(&CrawlSnapshot::default()).await.unwrap();

        assert_eq!(report, SaveReport::default());
        assert_eq!(store.submitted_batches(), 0);
    }

    #[tokio::test]
    async fn test_fetch_all_returns_saved_pages() {
        let store = Arc::new(MemoryStore::new());
        let repo = repository(Arc::clone(&store));
        let snapshot = snapshot_of(vec![page("a.com"), page("b.com/x")]);
        repo.save_all(&snapshot).await.unwrap();

        let pages = repo.fetch_all().await.unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages["a.com"], snapshot.pages["a.com"]);
        assert_eq!(pages["b.com/x"].title, "b.com/x");
    }

    #[tokio::test]
    async fn test_fetch_all_skips_corrupt_records() {
        let store = Arc::new(MemoryStore::new());
        let repo = repository(Arc::clone(&store));
        repo.save_all(&snapshot_of(vec![page("a.com")])).await.unwrap();

        let mut batch = WriteBatch::new();
        let mut corrupt = PageHash::new();
        corrupt.insert("title".to_string(), "no identity".to_string());
        batch.stage_hash("page:broken.com", corrupt);
        store.submit(batch).await.unwrap();

        let pages = repo.fetch_all().await.unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages.contains_key("a.com"));
    }

    #[tokio::test]
    async fn test_fetch_all_fails_whole_on_batch_error() {
        let store = Arc::new(FailingStore {
            fail_reads: true,
            ..FailingStore::default()
        });
        let mut batch = WriteBatch::new();
        for key in ["a.com", "b.com"] {
            batch.stage_hash(format!("page:{}", key), page(key).to_record().unwrap());
        }
        store.inner.submit(batch).await.unwrap();

        let repo = PageRepository::new(store as Arc<dyn PageStore>, &StoreConfig::default());
        assert!(matches!(
            repo.fetch_all().await,
            Err(StoreError::Batch { operations: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_wait_for_resume() {
        let store = Arc::new(MemoryStore::new());
        let repo = repository(Arc::clone(&store));

        assert!(!repo.wait_for_resume(Duration::from_millis(50)).await.unwrap());

        store.push("signal_queue", "SOMETHING_ELSE").await.unwrap();
        store.push("signal_queue", RESUME_SIGNAL).await.unwrap();
        assert!(repo.wait_for_resume(Duration::from_secs(1)).await.unwrap());
        assert!(store.queue("signal_queue").is_empty());
    }
}
