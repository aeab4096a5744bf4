//! Shared crawl state
//!
//! All discovered pages, both link graphs and the image lists live behind a
//! single mutex. Every public operation takes the lock once, so no reader
//! can observe a page whose links are only partly recorded.

use crate::crawler::fetcher::DiscoveredImage;
use crate::pages::{Image, Page, PageNode};
use crate::url::{is_valid_url, normalize_url};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Expected outcomes of adding a page that are not faults
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CrawlError {
    #[error("Page already visited: {0}")]
    AlreadyVisited(String),

    #[error("Capacity of {max_pages} pages reached")]
    CapacityExceeded { max_pages: usize },
}

/// The maps owned by a crawl session
///
/// Returned by [`CrawlState::into_snapshot`] once the crawl is over; from then
/// on it is plain read-only data for the persistence layer.
#[derive(Debug, Default, Clone)]
pub struct CrawlSnapshot {
    pub pages: HashMap<String, Page>,
    pub outlinks: HashMap<String, PageNode>,
    pub backlinks: HashMap<String, PageNode>,
    pub images: HashMap<String, Vec<Image>>,
}

/// Mutex-guarded crawl state shared by all workers
#[derive(Debug)]
pub struct CrawlState {
    maps: Mutex<CrawlSnapshot>,
    max_pages: usize,
    max_concurrency: usize,
}

impl CrawlState {
    pub fn new(max_pages: usize, max_concurrency: usize) -> Self {
        Self {
            maps: Mutex::new(CrawlSnapshot::default()),
            max_pages,
            max_concurrency,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CrawlSnapshot> {
        // Mutations never panic halfway, so a poisoned map is still consistent
        self.maps.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Number of discovered pages
    pub fn size(&self) -> usize {
        self.lock().pages.len()
    }

    /// True once the page count has reached the bound
    pub fn capacity_reached(&self) -> bool {
        self.lock().pages.len() >= self.max_pages
    }

    pub fn is_visited(&self, normalized_url: &str) -> bool {
        self.lock().pages.contains_key(normalized_url)
    }

    /// Inserts `page` if it is new and the bound has not been reached
    ///
    /// The duplicate check, the capacity check and the insertion happen under
    /// one lock, so racing callers can never push the count past `max_pages`.
    pub fn try_add_page(&self, page: Page) -> Result<(), CrawlError> {
        let mut maps = self.lock();
        Self::insert_page(&mut maps, page, self.max_pages)
    }

    /// Records the outgoing links of `source` and mirrors them as backlinks
    pub fn record_links(&self, source: &str, targets: &[String]) {
        let mut maps = self.lock();
        Self::insert_links(&mut maps, source, targets);
    }

    /// Appends the images found on `page_url`, in discovery order
    pub fn record_images(&self, page_url: &str, images: &[DiscoveredImage]) {
        let mut maps = self.lock();
        Self::insert_images(&mut maps, page_url, images);
    }

    /// Adds a page together with its links and images as one atomic step
    ///
    /// Nothing is recorded when the page is rejected.
    pub fn commit_page(
        &self,
        page: Page,
        links: &[String],
        images: &[DiscoveredImage],
    ) -> Result<(), CrawlError> {
        let source = page.normalized_url().to_string();
        let mut maps = self.lock();
        Self::insert_page(&mut maps, page, self.max_pages)?;
        Self::insert_links(&mut maps, &source, links);
        Self::insert_images(&mut maps, &source, images);
        Ok(())
    }

    /// Outgoing links recorded for `url`
    pub fn outlinks_of(&self, url: &str) -> Option<Vec<String>> {
        self.lock().outlinks.get(url).map(|n| n.links().to_vec())
    }

    /// Pages recorded as linking to `url`
    pub fn backlinks_of(&self, url: &str) -> Option<Vec<String>> {
        self.lock().backlinks.get(url).map(|n| n.links().to_vec())
    }

    /// Images recorded for `url`
    pub fn images_of(&self, url: &str) -> Vec<Image> {
        self.lock().images.get(url).cloned().unwrap_or_default()
    }

    /// Copies the current maps
    pub fn snapshot(&self) -> CrawlSnapshot {
        self.lock().clone()
    }

    /// Consumes the state and hands its maps over
    pub fn into_snapshot(self) -> CrawlSnapshot {
        self.maps.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert_page(maps: &mut CrawlSnapshot, page: Page, max_pages: usize) -> Result<(), CrawlError> {
        let key = page.normalized_url();

        if maps.pages.contains_key(key) {
            return Err(CrawlError::AlreadyVisited(key.to_string()));
        }

        if maps.pages.len() >= max_pages {
            return Err(CrawlError::CapacityExceeded { max_pages });
        }

        maps.pages.insert(key.to_string(), page);
        Ok(())
    }

    fn insert_links(maps: &mut CrawlSnapshot, source: &str, targets: &[String]) {
        // The new list replaces the old one, so its mirrored edges go too
        if let Some(previous) = maps.outlinks.remove(source) {
            for target in previous.links() {
                if let Some(node) = maps.backlinks.get_mut(target) {
                    node.remove_link(source);
                    if node.is_empty() {
                        maps.backlinks.remove(target);
                    }
                }
            }
        }

        // Every crawled page appears in the outlink graph, even with no links
        let mut outlinks = PageNode::new(source);

        for target in targets {
            if !is_valid_url(target) {
                continue;
            }

            let normalized = match normalize_url(target) {
                Ok(n) => n,
                Err(e) => {
                    tracing::debug!("Skipping link {} from {}: {}", target, source, e);
                    continue;
                }
            };

            if normalized == source {
                continue;
            }

            maps.backlinks
                .entry(normalized.clone())
                .or_insert_with(|| PageNode::new(normalized.as_str()))
                .append_link(source);
            outlinks.append_link(&normalized);
        }

        maps.outlinks.insert(source.to_string(), outlinks);
    }

    fn insert_images(maps: &mut CrawlSnapshot, page_url: &str, images: &[DiscoveredImage]) {
        let list = maps.images.entry(page_url.to_string()).or_default();
        for image in images {
            list.push(Image::new(page_url, &image.src, image.alt.as_deref()));
        }
    }
}
