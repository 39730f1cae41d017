//! URL handling module for Crawlscope
//!
//! This module provides URL normalization, relative link resolution, host
//! extraction, and the domain scope filter applied before links reach the frontier.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{extract_host, host_key, DomainScope};
pub use normalize::{normalize_url, resolve_url};
