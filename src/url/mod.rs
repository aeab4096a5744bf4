//! URL handling module for Link-Spider
//!
//! This module provides the URL validation and normalization collaborators
//! used when recording links and deduplicating pages.

mod normalize;

use url::Url;

pub use normalize::normalize_url;

/// Returns true if `raw` is an absolute HTTP(S) URL with a host
///
/// # Examples
///
/// ```
/// use link_spider::url::is_valid_url;
///
/// assert!(is_valid_url("https://example.com/page"));
/// assert!(!is_valid_url("/relative/path"));
/// assert!(!is_valid_url("javascript:void(0)"));
/// ```
pub fn is_valid_url(raw: &str) -> bool {
    match Url::parse(raw.trim()) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some_and(|h| !h.is_empty())
        }
        Err(_) => false,
    }
}
