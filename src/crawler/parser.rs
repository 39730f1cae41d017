//! HTML parser for extracting page content
//!
//! This module handles parsing HTML content to extract:
//! - Title, meta description and canonical link
//! - Heading texts in document order
//! - Visible body text (script, style, noscript and template excluded)
//! - Images with their alt text
//! - Links to follow (from `<a>` tags)
//! - The meta robots `noindex` flag

use crate::state::{Heading, ImageRef, PageContent};
use crate::url::resolve_url;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

/// Elements whose text never renders
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("body is not valid UTF-8")]
    Encoding,
}

/// Whether a response should go through the HTML extractor
///
/// Without a Content-Type header the body is sniffed for an HTML prefix.
pub fn is_html(content_type: Option<&str>, body: &[u8]) -> bool {
    match content_type {
        Some(ct) => ct.to_ascii_lowercase().contains("html"),
        None => {
            let head = String::from_utf8_lossy(&body[..body.len().min(256)]).to_ascii_lowercase();
            let head = head.trim_start();
            head.starts_with("<!doctype html") || head.starts_with("<html")
        }
    }
}

/// Parses a fetched body into page content
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - Fragment-only anchors
///
/// **Note:** `rel="nofollow"` links ARE followed
///
/// # Arguments
///
/// * `raw` - The response body
/// * `content_type` - Content-Type header value, if any
/// * `base_url` - The page URL, used to resolve relative links
///
/// # Returns
///
/// * `Ok(PageContent)` - Extracted fields; empty for non-HTML content
/// * `Err(ParseError)` - The body could not be decoded
///
/// # Example
///
/// ```
/// use crawlscope::crawler::parse_page;
/// use url::Url;
///
/// let html = br#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let content = parse_page(html, Some("text/html"), &base_url).unwrap();
/// assert_eq!(content.title, "Test");
/// assert_eq!(content.outlinks, vec!["https://example.com/page".to_string()]);
/// ```
pub fn parse_page(
    raw: &[u8],
    content_type: Option<&str>,
    base_url: &Url,
) -> Result<PageContent, ParseError> {
    if !is_html(content_type, raw) {
        return Ok(PageContent::default());
    }

    let html = std::str::from_utf8(raw).map_err(|_| ParseError::Encoding)?;
    let document = Html::parse_document(html);

    Ok(PageContent {
        title: extract_title(&document),
        meta_description: extract_meta(&document, "description").unwrap_or_default(),
        canonical: extract_canonical(&document, base_url),
        headings: extract_headings(&document),
        body_text: extract_visible_text(&document),
        images: extract_images(&document, base_url),
        outlinks: extract_links(&document, base_url),
        noindex: extract_noindex(&document),
    })
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> String {
    let Some(title_selector) = selector("title") else {
        return String::new();
    };

    document
        .select(&title_selector)
        .next()
        .map(element_text)
        .unwrap_or_default()
}

/// Content of the first `<meta name=...>` with the given name
fn extract_meta(document: &Html, name: &str) -> Option<String> {
    let meta_selector = selector("meta[name]")?;

    document
        .select(&meta_selector)
        .find(|el| {
            el.value()
                .attr("name")
                .is_some_and(|n| n.trim().eq_ignore_ascii_case(name))
        })
        .map(|el| collapse_whitespace(el.value().attr("content").unwrap_or("")))
}

fn extract_noindex(document: &Html) -> bool {
    extract_meta(document, "robots").is_some_and(|content| {
        content
            .to_ascii_lowercase()
            .split(',')
            .map(str::trim)
            .any(|directive| directive == "noindex" || directive == "none")
    })
}

/// Extracts `<link rel="canonical">`
///
/// An element with a missing or blank href yields `Some("")`.
fn extract_canonical(document: &Html, base_url: &Url) -> Option<String> {
    let link_selector = selector("link[rel]")?;

    let element = document.select(&link_selector).find(|el| {
        el.value().attr("rel").is_some_and(|rel| {
            rel.split_whitespace()
                .any(|r| r.eq_ignore_ascii_case("canonical"))
        })
    })?;

    let href = element.value().attr("href").unwrap_or("").trim();
    if href.is_empty() {
        return Some(String::new());
    }

    Some(
        resolve_url(base_url, href)
            .map(|url| url.to_string())
            .unwrap_or_else(|| href.to_string()),
    )
}

fn extract_headings(document: &Html) -> Vec<Heading> {
    let Some(heading_selector) = selector("h1, h2, h3, h4, h5, h6") else {
        return Vec::new();
    };

    document
        .select(&heading_selector)
        .filter_map(|el| {
            let level = el.value().name().get(1..)?.parse::<u8>().ok()?;
            Some(Heading {
                level,
                text: element_text(el),
            })
        })
        .collect()
}

/// Collects rendered text nodes under `<body>` (or the whole document)
fn extract_visible_text(document: &Html) -> String {
    let root = selector("body")
        .and_then(|body| document.select(&body).next())
        .unwrap_or_else(|| document.root_element());

    let mut parts = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            parts.push(&**text);
        }
    }

    collapse_whitespace(&parts.join(" "))
}

fn extract_images(document: &Html, base_url: &Url) -> Vec<ImageRef> {
    let Some(img_selector) = selector("img[src]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut images = Vec::new();

    for element in document.select(&img_selector) {
        let raw_src = element.value().attr("src").unwrap_or("").trim();
        if raw_src.is_empty() {
            continue;
        }
        let src = base_url
            .join(raw_src)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| raw_src.to_string());
        let alt = element.value().attr("alt").map(|a| a.trim().to_string());

        if seen.insert((src.clone(), alt.clone())) {
            images.push(ImageRef { src, alt });
        }
    }

    images
}

/// Extracts all followable links, normalized and deduplicated in document order
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let Some(a_selector) = selector("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&a_selector) {
        // Skip if it has the download attribute
        if element.value().attr("download").is_some() {
            continue;
        }

        if let Some(href) = element.value().attr("href") {
            if let Some(absolute_url) = resolve_url(base_url, href) {
                let link = absolute_url.to_string();
                if seen.insert(link.clone()) {
                    links.push(link);
                }
            }
        }
    }

    links
}
