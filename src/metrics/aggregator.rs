use crate::metrics::{BrokenLink, MetricCategory, MetricsSnapshot, MissingAlt};
use crate::state::Page;
use crate::url::{normalize_url, resolve_url};
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use url::Url;

/// Computes site-health metrics over the full page set
///
/// Deterministic: the same pages and blocked URLs always give the same
/// snapshot, independent of input order.
///
/// # Arguments
///
/// * `pages` - Every page committed so far
/// * `blocked` - URLs that robots.txt kept the crawler from fetching
pub fn compute<P: Borrow<Page>>(pages: &[P], blocked: &[String]) -> MetricsSnapshot {
    let pages: Vec<&Page> = pages.iter().map(Borrow::borrow).collect();
    let by_url: HashMap<&str, &Page> = pages.iter().map(|p| (p.url.as_str(), *p)).collect();

    let (broken_links, broken_link_edges) = broken_links(&pages, &by_url);
    let (alt_text_issues, missing_alt_images) = missing_alt(&pages);

    let html_ok: Vec<&Page> = pages
        .iter()
        .copied()
        .filter(|p| p.status.is_success() && p.is_html())
        .collect();

    MetricsSnapshot {
        total_pages: urls_where(&pages, |_| true),
        duplicate_pages: urls_where(&pages, Page::is_duplicate),
        duplicate_titles: shared_values(&pages, |p| &p.content.title),
        duplicate_descriptions: shared_values(&pages, |p| &p.content.meta_description),
        canonical_issues: urls_where(&pages, |p| has_canonical_issue(p, &by_url)),
        broken_links,
        broken_link_edges,
        alt_text_issues,
        missing_alt_images,
        duplicate_alt_text: duplicate_alt_text(&pages),
        status_2xx: status_bucket(&pages, 200),
        status_3xx: status_bucket(&pages, 300),
        status_4xx: status_bucket(&pages, 400),
        status_5xx: status_bucket(&pages, 500),
        network_failures: urls_where(&pages, |p| p.status.is_network_failure()),
        indexable: urls_where(&pages, Page::is_indexable),
        non_indexable: MetricCategory::from_urls(
            pages
                .iter()
                .filter(|p| !p.is_indexable())
                .map(|p| p.url.clone())
                .chain(blocked.iter().cloned()),
        ),
        blocked_by_robots: MetricCategory::from_urls(blocked.iter().cloned()),
        missing_titles: urls_where(&html_ok, |p| p.content.title.trim().is_empty()),
        missing_descriptions: urls_where(&html_ok, |p| {
            p.content.meta_description.trim().is_empty()
        }),
        missing_h1: urls_where(&html_ok, |p| p.h1_count() == 0),
    }
}

fn urls_where<F>(pages: &[&Page], predicate: F) -> MetricCategory
where
    F: Fn(&Page) -> bool,
{
    MetricCategory::from_urls(
        pages
            .iter()
            .filter(|p| predicate(p))
            .map(|p| p.url.clone()),
    )
}

fn status_bucket(pages: &[&Page], floor: u16) -> MetricCategory {
    urls_where(pages, |p| {
        p.status
            .code()
            .map_or(false, |code| code >= floor && code < floor + 100)
    })
}

/// Pages whose value is non-empty and shared case-insensitively with another page
fn shared_values<F>(pages: &[&Page], value: F) -> MetricCategory
where
    F: Fn(&Page) -> &String,
{
    let mut groups: HashMap<String, Vec<&str>> = HashMap::new();
    for page in pages {
        let key = value(page).trim().to_lowercase();
        if !key.is_empty() {
            groups.entry(key).or_default().push(&page.url);
        }
    }

    MetricCategory::from_urls(
        groups
            .into_values()
            .filter(|urls| urls.len() >= 2)
            .flatten(),
    )
}

/// A canonical link that is empty, unresolvable, points elsewhere, or points at a failed page
fn has_canonical_issue(page: &Page, by_url: &HashMap<&str, &Page>) -> bool {
    let Some(canonical) = page.content.canonical.as_deref() else {
        return false;
    };
    if canonical.trim().is_empty() {
        return true;
    }

    let Ok(base) = Url::parse(&page.url) else {
        return true;
    };
    let Some(target) = resolve_url(&base, canonical) else {
        return true;
    };

    let own = normalize_url(&page.url).map(String::from).unwrap_or_default();
    if target.as_str() != own {
        return true;
    }

    by_url
        .get(target.as_str())
        .map_or(false, |target_page| target_page.status.is_broken())
}

fn broken_links(
    pages: &[&Page],
    by_url: &HashMap<&str, &Page>,
) -> (MetricCategory, Vec<BrokenLink>) {
    let mut edges = Vec::new();
    for page in pages {
        for target in &page.content.outlinks {
            if let Some(target_page) = by_url.get(target.as_str()) {
                if target_page.status.is_broken() {
                    edges.push(BrokenLink {
                        source: page.url.clone(),
                        target: target.clone(),
                        status: target_page.status.to_string(),
                    });
                }
            }
        }
    }

    edges.sort_by(|a, b| (&a.source, &a.target).cmp(&(&b.source, &b.target)));
    edges.dedup();

    let targets = MetricCategory::from_urls(edges.iter().map(|e| e.target.clone()));
    (targets, edges)
}

fn missing_alt(pages: &[&Page]) -> (MetricCategory, Vec<MissingAlt>) {
    let mut missing: Vec<MissingAlt> = pages
        .iter()
        .flat_map(|page| {
            page.content
                .images
                .iter()
                .filter(|img| img.missing_alt())
                .map(move |img| MissingAlt {
                    page: page.url.clone(),
                    image: img.src.clone(),
                })
        })
        .collect();
    missing.sort_by(|a, b| (&a.page, &a.image).cmp(&(&b.page, &b.image)));
    missing.dedup();

    let affected = MetricCategory::from_urls(missing.iter().map(|m| m.page.clone()));
    (affected, missing)
}

/// Pages carrying an alt text that appears on two or more distinct images
fn duplicate_alt_text(pages: &[&Page]) -> MetricCategory {
    let mut by_alt: BTreeMap<String, Vec<(&str, &str)>> = BTreeMap::new();
    for page in pages {
        for img in &page.content.images {
            if img.missing_alt() {
                continue;
            }
            let alt = img.alt.as_deref().unwrap_or_default().trim().to_lowercase();
            by_alt
                .entry(alt)
                .or_default()
                .push((page.url.as_str(), img.src.as_str()));
        }
    }

    MetricCategory::from_urls(
        by_alt
            .into_values()
            .filter(|uses| {
                let mut srcs: Vec<&str> = uses.iter().map(|(_, src)| *src).collect();
                srcs.sort_unstable();
                srcs.dedup();
                srcs.len() >= 2
            })
            .flat_map(|uses| uses.into_iter().map(|(page, _)| page.to_string())),
    )
}
