//! Configuration module for Crawlscope
//!
//! This module handles loading, parsing, and validating TOML configuration files
//! and the per-run [`CrawlJob`] parameters.
//!
//! # Example
//!
//! ```no_run
//! use crawlscope::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl.toml")).unwrap();
//! println!("Crawl will fetch at most {} pages", config.crawl.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlJob, OutputConfig, UserAgentConfig};

// Re-export parser and validation functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::{validate_job, validate_user_agent};
