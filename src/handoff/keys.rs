use crate::config::StoreConfig;

/// Prefix of the per-image hash records
const IMAGE_PREFIX: &str = "image";

/// Store key naming shared with the indexers
///
/// Page, graph and image-set keys are `<prefix>:<normalized url>`; image
/// hashes are `image:<source url>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    page_prefix: String,
    outlinks_prefix: String,
    backlinks_prefix: String,
    images_prefix: String,
}

impl KeySpace {
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            page_prefix: config.page_prefix.clone(),
            outlinks_prefix: config.outlinks_prefix.clone(),
            backlinks_prefix: config.backlinks_prefix.clone(),
            images_prefix: config.images_prefix.clone(),
        }
    }

    /// Prefix matching every page key, separator included
    pub fn page_pattern(&self) -> String {
        format!("{}:", self.page_prefix)
    }

    pub fn page(&self, normalized_url: &str) -> String {
        format!("{}:{}", self.page_prefix, normalized_url)
    }

    pub fn outlinks(&self, normalized_url: &str) -> String {
        format!("{}:{}", self.outlinks_prefix, normalized_url)
    }

    pub fn backlinks(&self, normalized_url: &str) -> String {
        format!("{}:{}", self.backlinks_prefix, normalized_url)
    }

    /// Set of image sources found on a page
    pub fn page_images(&self, normalized_url: &str) -> String {
        format!("{}:{}", self.images_prefix, normalized_url)
    }

    /// Hash of an image, addressed by its source URL
    ///
    /// Members of a `page_images` set map directly onto these keys.
    pub fn image(&self, source_url: &str) -> String {
        format!("{}:{}", IMAGE_PREFIX, source_url)
    }
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::from_config(&StoreConfig::default())
    }
}
