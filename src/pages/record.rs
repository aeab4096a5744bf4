//! Flat hash representation of pages and images
//!
//! The store keeps each page as a single-level field → string mapping so
//! that native hash commands (`HSET`/`HGETALL`) can read and write it.

use crate::pages::{Image, Page};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;
use thiserror::Error;
use url::Url;

/// Field-name → value mapping as stored
pub type PageHash = HashMap<String, String>;

const FIELD_NORMALIZED_URL: &str = "normalized_url";
const FIELD_URL: &str = "url";
const FIELD_TITLE: &str = "title";
const FIELD_DESCRIPTION: &str = "description";
const FIELD_CONTENT: &str = "content";
const FIELD_LAST_CRAWLED: &str = "last_crawled";

/// Errors converting between pages and their stored records
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("Cannot serialize page {url}: {reason}")]
    Serialization { url: String, reason: String },

    #[error("Cannot deserialize page record: {0}")]
    Deserialization(String),
}

impl Page {
    /// Converts the page into its stored hash form
    ///
    /// Fails when the identity key is unusable as a store key or the
    /// fetched URL is not absolute.
    pub fn to_record(&self) -> Result<PageHash, RecordError> {
        let key = self.normalized_url();
        if key.is_empty() || key.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(RecordError::Serialization {
                url: key.to_string(),
                reason: "normalized URL is empty or contains whitespace".to_string(),
            });
        }

        if Url::parse(&self.url).is_err() {
            return Err(RecordError::Serialization {
                url: key.to_string(),
                reason: format!("'{}' is not an absolute URL", self.url),
            });
        }

        let mut hash = PageHash::with_capacity(6);
        hash.insert(FIELD_NORMALIZED_URL.to_string(), key.to_string());
        hash.insert(FIELD_URL.to_string(), self.url.clone());
        hash.insert(FIELD_TITLE.to_string(), self.title.clone());
        hash.insert(FIELD_DESCRIPTION.to_string(), self.description.clone());
        hash.insert(FIELD_CONTENT.to_string(), self.content.clone());
        hash.insert(
            FIELD_LAST_CRAWLED.to_string(),
            self.last_crawled.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        );
        Ok(hash)
    }

    /// Rebuilds a page from its stored hash form
    pub fn from_record(hash: &PageHash) -> Result<Self, RecordError> {
        let normalized_url = required(hash, FIELD_NORMALIZED_URL)?;
        if normalized_url.is_empty() {
            return Err(RecordError::Deserialization(
                "empty normalized_url".to_string(),
            ));
        }

        let last_crawled = required(hash, FIELD_LAST_CRAWLED)?;
        let last_crawled = DateTime::parse_from_rfc3339(last_crawled)
            .map_err(|e| {
                RecordError::Deserialization(format!(
                    "bad last_crawled '{}' for {}: {}",
                    last_crawled, normalized_url, e
                ))
            })?
            .with_timezone(&Utc);

        Ok(Self {
            normalized_url: normalized_url.to_string(),
            url: required(hash, FIELD_URL)?.to_string(),
            title: required(hash, FIELD_TITLE)?.to_string(),
            description: hash.get(FIELD_DESCRIPTION).cloned().unwrap_or_default(),
            content: required(hash, FIELD_CONTENT)?.to_string(),
            last_crawled,
        })
    }
}

impl Image {
    /// Stored hash form of an image
    pub fn to_record(&self) -> PageHash {
        let mut hash = PageHash::with_capacity(3);
        hash.insert("page_url".to_string(), self.normalized_page_url.clone());
        hash.insert("src".to_string(), self.normalized_source_url.clone());
        hash.insert("alt".to_string(), self.alt.clone());
        hash
    }
}

fn required<'a>(hash: &'a PageHash, field: &str) -> Result<&'a str, RecordError> {
    hash.get(field)
        .map(String::as_str)
        .ok_or_else(|| RecordError::Deserialization(format!("missing field '{}'", field)))
}
