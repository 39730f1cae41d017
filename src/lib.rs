//! Crawlscope: a polite site crawler with a content index and site-health metrics
//!
//! This crate crawls a bounded set of pages reachable from a start URL, extracts
//! structured content from each page, detects exact-duplicate content, builds a
//! searchable inverted index and derives SEO-style site-health metrics.

pub mod config;
pub mod content;
pub mod crawler;
pub mod index;
pub mod metrics;
pub mod output;
pub mod robots;
pub mod service;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Crawlscope operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
///
/// These are the only errors that are fatal to a crawl, and they are reported
/// synchronously when the crawl is started.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Errors reported by the read-only query operations (search, metrics, status)
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("Unknown search field: {0}")]
    UnknownField(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown crawl job: {0}")]
    UnknownJob(String),
}

/// Result type alias for Crawlscope operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{Config, CrawlJob};
pub use index::{Field, SearchHit, SearchQuery};
pub use metrics::MetricsSnapshot;
pub use service::{CrawlService, JobId};
pub use state::{CrawlProgress, CrawlState, FetchStatus, Page, PageId};
pub use crate::url::{normalize_url, DomainScope};
