//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The bounded, deduplicating URL frontier
//! - Request scheduling and per-host rate limiting
//! - HTTP fetching with retry logic
//! - HTML parsing and content extraction
//! - The fetch worker pool and the single-writer committer
//! - Overall crawl coordination

mod backoff;
mod committer;
mod controller;
mod fetcher;
mod frontier;
mod parser;
mod results;
mod scheduler;
mod worker;

pub use backoff::ExponentialBackoff;
pub use committer::{CommitMessage, Committer, PageDraft, StoreWriter};
pub use controller::CrawlController;
pub use fetcher::{build_http_client, fetch_url, FetchError, FetchResponse, NetworkErrorKind};
pub use frontier::{EnqueueOutcome, Frontier, FrontierEntry};
pub use parser::{is_html, parse_page, ParseError};
pub use results::CrawlResults;
pub use scheduler::{effective_delay, PoliteScheduler, SchedulerToken};
pub use worker::{run_worker, spawn_workers, WorkerContext};
