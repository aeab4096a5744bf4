use serde::Deserialize;

/// Main configuration structure for Link-Spider
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub store: StoreConfig,
    pub seeds: SeedConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of pages discovered in one crawl cycle
    #[serde(rename = "max-pages")]
    pub max_pages: usize,

    /// Maximum number of concurrent fetch workers
    #[serde(rename = "max-concurrency")]
    pub max_concurrency: usize,

    /// Upper bound on a single fetch (milliseconds)
    #[serde(rename = "fetch-timeout-ms", default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Number of crawl/persist cycles to run
    #[serde(default = "default_cycles")]
    pub cycles: u32,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Which store implementation the handoff writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Redis,
    Sqlite,
    Memory,
}

/// Store and queue naming configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub redis_url: String,
    pub database_path: String,

    /// Key prefixes
    pub page_prefix: String,
    pub outlinks_prefix: String,
    pub backlinks_prefix: String,
    pub images_prefix: String,

    /// Queue names
    pub indexer_queue: String,
    pub image_indexer_queue: String,
    pub signal_queue: String,

    /// Block between cycles until the indexer signals it has caught up
    pub wait_for_signal: bool,
    pub signal_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Redis,
            redis_url: "redis://127.0.0.1:6379/".to_string(),
            database_path: "./spider.db".to_string(),
            page_prefix: "page".to_string(),
            outlinks_prefix: "outlinks".to_string(),
            backlinks_prefix: "backlinks".to_string(),
            images_prefix: "page_images".to_string(),
            indexer_queue: "pages_queue".to_string(),
            image_indexer_queue: "images_queue".to_string(),
            signal_queue: "signal_queue".to_string(),
            wait_for_signal: false,
            signal_timeout_secs: 300,
        }
    }
}

/// Seed URLs for the first crawl cycle
#[derive(Debug, Clone, Deserialize)]
pub struct SeedConfig {
    pub urls: Vec<String>,
}

fn default_fetch_timeout_ms() -> u64 {
    10_000
}

fn default_cycles() -> u32 {
    1
}
