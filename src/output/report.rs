//! Plain-text reports printed by the CLI

use crate::index::SearchHit;
use crate::metrics::MetricsSnapshot;
use crate::state::CrawlProgress;

/// URLs listed per category before the list is truncated
const MAX_LISTED_URLS: usize = 10;

/// Prints crawl progress on one line
pub fn print_progress(job_id: &str, progress: &CrawlProgress) {
    println!(
        "[{}] {}: {} pages fetched, {} queued",
        job_id, progress.state, progress.pages_fetched, progress.pages_queued
    );
}

/// Formats site-health metrics for the terminal
pub fn format_metrics(metrics: &MetricsSnapshot) -> String {
    let mut out = String::from("=== Site Health ===\n\n");

    let total = metrics.total_pages.count;
    for (name, category) in metrics.categories() {
        let percentage = if total > 0 {
            (category.count as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        out.push_str(&format!(
            "  {:<32} {:>6} ({:.1}%)\n",
            name, category.count, percentage
        ));
    }
    out.push('\n');

    for (name, category) in metrics.categories().into_iter().skip(1) {
        if category.is_empty() || name.ends_with("responses") || name.starts_with("Indexable") {
            continue;
        }
        out.push_str(&format!("{} ({}):\n", name, category.count));
        for url in category.urls.iter().take(MAX_LISTED_URLS) {
            out.push_str(&format!("  - {}\n", url));
        }
        if category.count > MAX_LISTED_URLS {
            out.push_str(&format!("  ... and {} more\n", category.count - MAX_LISTED_URLS));
        }
        out.push('\n');
    }

    if !metrics.broken_link_edges.is_empty() {
        out.push_str(&format!("Broken link sources ({}):\n", metrics.broken_link_edges.len()));
        for edge in metrics.broken_link_edges.iter().take(MAX_LISTED_URLS) {
            out.push_str(&format!("  {} -> {} [{}]\n", edge.source, edge.target, edge.status));
        }
        out.push('\n');
    }

    out
}

/// Prints site-health metrics to stdout
pub fn print_metrics(metrics: &MetricsSnapshot) {
    print!("{}", format_metrics(metrics));
}

/// Formats search results, one hit per block
pub fn format_search_results(query: &str, hits: &[SearchHit]) -> String {
    let mut out = format!("=== Search: {} ({} results) ===\n\n", query, hits.len());
    for (rank, hit) in hits.iter().enumerate() {
        out.push_str(&format!("{:>3}. {} [{}]\n", rank + 1, hit.url, hit.field.as_str()));
        out.push_str(&format!("     {}\n", hit.snippet));
    }
    out
}

pub fn print_search_results(query: &str, hits: &[SearchHit]) {
    print!("{}", format_search_results(query, hits));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Field;
    use crate::metrics::MetricCategory;
    use crate::state::PageId;

    #[test]
    fn test_format_metrics_lists_urls() {
        let metrics = MetricsSnapshot {
            total_pages: MetricCategory::from_urls(["https://a.test/", "https://a.test/b"]),
            duplicate_pages: MetricCategory::from_urls(["https://a.test/b"]),
            ..Default::default()
        };

        let text = format_metrics(&metrics);
        assert!(text.contains("Duplicate pages"));
        assert!(text.contains("(50.0%)"));
        assert!(text.contains("  - https://a.test/b"));
    }

    #[test]
    fn test_format_search_results() {
        let hits = vec![SearchHit {
            page: PageId(0),
            url: "https://a.test/".to_string(),
            field: Field::Title,
            snippet: "hello world".to_string(),
        }];

        let text = format_search_results("hello", &hits);
        assert!(text.contains("1 results"));
        assert!(text.contains("https://a.test/ [title]"));
    }
}
