//! Markdown site-health report
//!
//! This module renders a crawl's metrics as a markdown document with an
//! overview table and one drill-down section per non-empty category.

use crate::metrics::MetricsSnapshot;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// URLs listed per drill-down section
const MAX_SECTION_URLS: usize = 50;

/// Writes the markdown report for a job to `output_path`
///
/// # Arguments
///
/// * `job_id` - The crawl the metrics belong to
/// * `metrics` - Metrics computed over the crawl's pages
/// * `output_path` - Path where the markdown file should be written
pub fn write_markdown_report(
    job_id: &str,
    metrics: &MetricsSnapshot,
    output_path: &Path,
) -> std::io::Result<()> {
    let markdown = format_markdown_report(job_id, metrics);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats metrics as markdown
pub fn format_markdown_report(job_id: &str, metrics: &MetricsSnapshot) -> String {
    let mut md = String::new();

    md.push_str("# Crawlscope Site Health Report\n\n");
    md.push_str(&format!("- **Job ID**: {}\n", job_id));
    md.push_str(&format!("- **Pages**: {}\n\n", metrics.total_pages.count));

    md.push_str("## Overview\n\n");
    md.push_str("| Category | Count |\n");
    md.push_str("|----------|-------|\n");
    for (name, category) in metrics.categories() {
        md.push_str(&format!("| {} | {} |\n", name, category.count));
    }
    md.push('\n');

    for (name, category) in metrics.categories().into_iter().skip(1) {
        if category.is_empty() {
            continue;
        }
        md.push_str(&format!("## {}\n\n", name));
        for url in category.urls.iter().take(MAX_SECTION_URLS) {
            md.push_str(&format!("- {}\n", url));
        }
        if category.count > MAX_SECTION_URLS {
            md.push_str(&format!(
                "\n... and {} more\n",
                category.count - MAX_SECTION_URLS
            ));
        }
        md.push('\n');
    }

    if !metrics.broken_link_edges.is_empty() {
        md.push_str("## Broken Link Sources\n\n");
        md.push_str("| Source | Target | Status |\n");
        md.push_str("|--------|--------|--------|\n");
        for edge in &metrics.broken_link_edges {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                edge.source, edge.target, edge.status
            ));
        }
        md.push('\n');
    }

    if !metrics.missing_alt_images.is_empty() {
        md.push_str("## Images Missing Alt Text\n\n");
        md.push_str("| Page | Image |\n");
        md.push_str("|------|-------|\n");
        for missing in metrics.missing_alt_images.iter().take(MAX_SECTION_URLS) {
            md.push_str(&format!("| {} | {} |\n", missing.page, missing.image));
        }
        md.push('\n');
    }

    md
}
