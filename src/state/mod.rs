//! State module for crawl results and progress
//!
//! # Components
//!
//! - `Page`: Immutable snapshot of one fetched URL
//! - `FetchStatus`: HTTP status or network failure recorded on a page
//! - `CrawlState` / `CrawlProgress`: Lifecycle state reported by crawl status
//! - `HostState`: Per-host request bookkeeping used by the polite scheduler

mod host_state;
mod page;

// Re-export main types
pub use host_state::HostState;
pub use page::{
    CrawlProgress, CrawlState, FetchStatus, Heading, ImageRef, Page, PageContent, PageId,
};
