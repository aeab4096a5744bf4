//! Page model for crawled documents
//!
//! # Components
//!
//! - `Page`: a crawled document keyed by its normalized URL
//! - `PageNode`: a link-graph vertex (shared by the outlink and backlink graphs)
//! - `Image`: an image reference owned by exactly one page
//! - `record`: the flat hash representation written to the store

mod node;
mod record;

pub use node::PageNode;
pub use record::{PageHash, RecordError};

use chrono::{DateTime, Utc};

/// A crawled page
///
/// The normalized URL is the page's identity and cannot change after
/// construction; every other field is plain data filled in by the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    normalized_url: String,

    /// Absolute URL the page was fetched from
    pub url: String,

    /// Contents of the `<title>` element (may be empty)
    pub title: String,

    /// `<meta name="description">` content (may be empty)
    pub description: String,

    /// Extracted visible text
    pub content: String,

    /// When the page was fetched
    pub last_crawled: DateTime<Utc>,
}

impl Page {
    /// Creates an empty page for `url`, stamped with the current time
    pub fn new(url: impl Into<String>, normalized_url: impl Into<String>) -> Self {
        Self {
            normalized_url: normalized_url.into(),
            url: url.into(),
            title: String::new(),
            description: String::new(),
            content: String::new(),
            last_crawled: Utc::now(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// The page's identity key
    pub fn normalized_url(&self) -> &str {
        &self.normalized_url
    }
}

/// An image referenced by a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Normalized URL of the page the image was found on
    pub normalized_page_url: String,

    /// Image source URL as reported by the extractor
    pub normalized_source_url: String,

    /// Alt text; empty when the tag had none
    pub alt: String,
}

impl Image {
    pub fn new(page_url: &str, source_url: &str, alt: Option<&str>) -> Self {
        Self {
            normalized_page_url: page_url.to_string(),
            normalized_source_url: source_url.to_string(),
            alt: alt.unwrap_or_default().to_string(),
        }
    }
}
