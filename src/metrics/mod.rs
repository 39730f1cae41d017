//! Site-health metrics derived from the crawled page set
//!
//! Metrics are never maintained incrementally. [`compute`] is a pure function
//! recomputed on demand from every page committed so far.

mod aggregator;

pub use aggregator::compute;

use serde::Serialize;

/// Count and affected URLs for one metric
///
/// `count` always equals `urls.len()`; URLs are sorted and unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricCategory {
    pub count: usize,
    pub urls: Vec<String>,
}

impl MetricCategory {
    /// Builds a category from URLs in any order, dropping repeats
    pub fn from_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut urls: Vec<String> = urls.into_iter().map(Into::into).collect();
        urls.sort();
        urls.dedup();
        Self {
            count: urls.len(),
            urls,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// A link from one page to a page that failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokenLink {
    pub source: String,
    pub target: String,
    /// Fetch status of the target, e.g. `500` or `timeout`
    pub status: String,
}

/// An image without usable alt text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingAlt {
    pub page: String,
    pub image: String,
}

/// Site-health metrics at one point in a crawl
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub total_pages: MetricCategory,
    /// Pages whose content duplicates an earlier page
    pub duplicate_pages: MetricCategory,
    /// Pages sharing a non-empty title with another page
    pub duplicate_titles: MetricCategory,
    /// Pages sharing a non-empty meta description with another page
    pub duplicate_descriptions: MetricCategory,
    pub canonical_issues: MetricCategory,
    /// Link targets that failed or returned >= 400
    pub broken_links: MetricCategory,
    pub broken_link_edges: Vec<BrokenLink>,
    /// Pages with at least one image missing alt text
    pub alt_text_issues: MetricCategory,
    pub missing_alt_images: Vec<MissingAlt>,
    /// Pages with an alt text also used by another image
    pub duplicate_alt_text: MetricCategory,
    pub status_2xx: MetricCategory,
    pub status_3xx: MetricCategory,
    pub status_4xx: MetricCategory,
    pub status_5xx: MetricCategory,
    pub network_failures: MetricCategory,
    pub indexable: MetricCategory,
    /// Non-indexable pages plus URLs disallowed by robots.txt
    pub non_indexable: MetricCategory,
    pub blocked_by_robots: MetricCategory,
    pub missing_titles: MetricCategory,
    pub missing_descriptions: MetricCategory,
    pub missing_h1: MetricCategory,
}

impl MetricsSnapshot {
    /// Every URL category with its display name, in report order
    pub fn categories(&self) -> Vec<(&'static str, &MetricCategory)> {
        vec![
            ("Total pages", &self.total_pages),
            ("Duplicate pages", &self.duplicate_pages),
            ("Duplicate titles", &self.duplicate_titles),
            ("Duplicate meta descriptions", &self.duplicate_descriptions),
            ("Canonical issues", &self.canonical_issues),
            ("Broken links", &self.broken_links),
            ("Pages with images missing alt", &self.alt_text_issues),
            ("Pages with duplicate alt text", &self.duplicate_alt_text),
            ("2xx responses", &self.status_2xx),
            ("3xx responses", &self.status_3xx),
            ("4xx responses", &self.status_4xx),
            ("5xx responses", &self.status_5xx),
            ("Network failures", &self.network_failures),
            ("Indexable", &self.indexable),
            ("Non-indexable", &self.non_indexable),
            ("Blocked by robots.txt", &self.blocked_by_robots),
            ("Missing titles", &self.missing_titles),
            ("Missing meta descriptions", &self.missing_descriptions),
            ("Missing h1", &self.missing_h1),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_sorted_unique() {
        let cat = MetricCategory::from_urls(vec!["b", "a", "b"]);
        assert_eq!(cat.count, 2);
        assert_eq!(cat.urls, vec!["a".to_string(), "b".to_string()]);
    }
}
