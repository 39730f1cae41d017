use crate::index::Field;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure for Crawlscope
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlJob,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Parameters of a single crawl run
///
/// A job is frozen once the crawl starts; every component receives it through
/// the crawl context rather than reading global state.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlJob {
    /// Seed URL of the crawl
    pub start_url: String,

    /// Hard cap on the number of pages created
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Only follow links whose host equals the seed's host
    #[serde(default = "default_same_domain_only")]
    pub same_domain_only: bool,

    /// Number of concurrent fetch workers
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Minimum seconds between two requests to the same host
    #[serde(default = "default_per_host_delay")]
    pub per_host_delay: f64,

    /// Fields fed into the inverted index
    #[serde(default = "default_search_fields")]
    pub search_fields: Vec<Field>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Retries for transient network errors
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Maximum number of entries waiting in the frontier
    #[serde(default = "default_frontier_capacity")]
    pub frontier_capacity: usize,

    /// Maximum simultaneous in-flight fetches to one host
    #[serde(default = "default_max_per_host")]
    pub max_per_host: u32,
}

impl CrawlJob {
    /// Creates a job for the given seed with every other setting at its default
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            max_pages: default_max_pages(),
            same_domain_only: default_same_domain_only(),
            concurrency: default_concurrency(),
            per_host_delay: default_per_host_delay(),
            search_fields: default_search_fields(),
            request_timeout: default_request_timeout(),
            max_retries: default_max_retries(),
            frontier_capacity: default_frontier_capacity(),
            max_per_host: default_max_per_host(),
        }
    }

    /// Configured per-host delay as a duration
    ///
    /// Values rejected by `validate_job` map to no delay.
    pub fn per_host_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.per_host_delay).unwrap_or_default()
    }

    /// Configured request timeout as a duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

fn default_max_pages() -> u32 {
    2000
}

fn default_same_domain_only() -> bool {
    true
}

fn default_concurrency() -> u32 {
    8
}

fn default_per_host_delay() -> f64 {
    0.5
}

fn default_search_fields() -> Vec<Field> {
    Field::ALL.to_vec()
}

fn default_request_timeout() -> u64 {
    15
}

fn default_max_retries() -> u32 {
    2
}

fn default_frontier_capacity() -> usize {
    10_000
}

fn default_max_per_host() -> u32 {
    2
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler, also the token matched against robots.txt groups
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

impl UserAgentConfig {
    /// Full `User-Agent` header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "crawlscope".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/crawlscope".to_string(),
            contact_email: "crawlscope@example.com".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite page store; no persistence when absent
    #[serde(rename = "database-path", default)]
    pub database_path: Option<String>,
}
