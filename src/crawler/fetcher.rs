//! Fetch-and-extract collaborator
//!
//! This module defines the seam between the crawl driver and the network:
//! - `PageFetcher`: turns a URL into a page, its outgoing links and images
//! - `HttpFetcher`: the default implementation over reqwest + scraper
//! - `FetchError`: per-URL failures (the crawl continues past them)

use crate::config::UserAgentConfig;
use crate::crawler::parser::parse_html;
use crate::pages::Page;
use crate::url::normalize_url;
use crate::UrlError;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Failure to fetch or extract a single URL
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Expected HTML from {url}, got '{content_type}'")]
    NotHtml { url: String, content_type: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Unusable URL {url}: {source}")]
    Url { url: String, source: UrlError },
}

/// An image reference as reported by the extractor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredImage {
    /// Absolute image source URL
    pub src: String,

    /// Alt text, if the tag had one
    pub alt: Option<String>,
}

impl DiscoveredImage {
    pub fn new(src: impl Into<String>, alt: Option<&str>) -> Self {
        Self {
            src: src.into(),
            alt: alt.map(str::to_string),
        }
    }
}

/// Everything the crawl core needs from one fetched URL
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub page: Page,

    /// Absolute outgoing links, unfiltered
    pub links: Vec<String>,

    /// Images in document order
    pub images: Vec<DiscoveredImage>,
}

/// Fetches a URL and extracts its page, links and images
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_and_extract(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Whole-request timeout
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Default fetcher: HTTP GET followed by HTML extraction
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a fetcher with its own client
    pub fn from_config(config: &UserAgentConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(config, timeout)?))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_and_extract(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Http {
                    url: url.to_string(),
                    source: e,
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !content_type.contains("text/html") {
            return Err(FetchError::NotHtml {
                url: url.to_string(),
                content_type,
            });
        }

        // Links resolve against the post-redirect location
        let final_url: Url = response.url().clone();

        let body = response.text().await.map_err(|e| FetchError::Http {
            url: url.to_string(),
            source: e,
        })?;

        let normalized = normalize_url(final_url.as_str()).map_err(|e| FetchError::Url {
            url: final_url.to_string(),
            source: e,
        })?;

        let parsed = parse_html(&body, &final_url);
        tracing::debug!(
            "Fetched {} ({} links, {} images)",
            normalized,
            parsed.links.len(),
            parsed.images.len()
        );

        let page = Page::new(final_url.as_str(), normalized)
            .with_title(parsed.title.unwrap_or_default())
            .with_description(parsed.description.unwrap_or_default())
            .with_content(parsed.content);

        Ok(FetchedPage {
            page,
            links: parsed.links,
            images: parsed.images,
        })
    }
}
