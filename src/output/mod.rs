//! Output module for presenting crawl results
//!
//! This module handles:
//! - Building the site graph (pages as nodes, outlinks as edges)
//! - Printing metrics and search results to the terminal
//! - Writing markdown site-health reports

mod graph;
mod markdown;
mod report;

pub use graph::{GraphEdge, GraphNode, SiteGraph};
pub use markdown::{format_markdown_report, write_markdown_report};
pub use report::{
    format_metrics, format_search_results, print_metrics, print_progress, print_search_results,
};
