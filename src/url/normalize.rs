use crate::UrlError;
use url::Url;

/// Link schemes that never lead to a fetchable page
const SKIPPED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Normalizes a URL so equivalent spellings map to one frontier key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Require an http or https scheme
/// 3. Lowercase the host
/// 4. Drop the port when it is the scheme default
/// 5. Normalize path:
///    - Remove dot segments (. and ..) and repeated slashes
///    - Remove trailing slash (except for root /)
///    - Empty path becomes /
/// 6. Remove fragment (everything after #)
/// 7. Keep the query as written, dropping an empty one (trailing ?)
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize
///
/// # Returns
///
/// * `Ok(Url)` - Normalized URL
/// * `Err(UrlError)` - Failed to parse or normalize the URL
///
/// # Examples
///
/// ```
/// use crawlscope::url::normalize_url;
///
/// let url = normalize_url("HTTP://Example.COM:80/a/./b/?q=1#top").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/a/b?q=1");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    // Step 1: Parse the URL
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    // Step 2: Validate scheme
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    // Step 3: Lowercase the host
    let host = match url.host_str() {
        Some(host) if !host.is_empty() => host.to_lowercase(),
        _ => return Err(UrlError::MissingHost),
    };
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;

    // Step 4: Strip default port
    if url.port().is_some() && url.port() == default_port(url.scheme()) {
        // set_port only fails for cannot-be-a-base URLs, excluded by the scheme check
        let _ = url.set_port(None);
    }

    // Step 5: Normalize path
    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    // Step 6: Remove fragment
    url.set_fragment(None);

    // Step 7: Drop an empty query
    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url)
}

/// Resolves a link found on `base` into a normalized absolute URL
///
/// Returns None for links that cannot lead to a page: fragment-only anchors,
/// `javascript:`/`mailto:`/`tel:`/`data:` links, and anything that fails to
/// normalize.
pub fn resolve_url(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if SKIPPED_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
        return None;
    }

    let joined = base.join(href).ok()?;
    normalize_url(joined.as_str()).ok()
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let mut normalized_segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            // Skip empty segments (from multiple slashes) and current directory markers
            "" | "." => continue,
            ".." => {
                normalized_segments.pop();
            }
            _ => normalized_segments.push(segment),
        }
    }

    if normalized_segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", normalized_segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_preserved() {
        let result = normalize_url("http://example.com/page").unwrap();
        assert_eq!(result.as_str(), "http://example.com/page");
    }

    #[test]
    fn test_remove_trailing_slash() {
        let result = normalize_url("https://example.com/page/").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_keep_root_slash() {
        let result = normalize_url("https://example.com/").unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn test_remove_fragment() {
        let result = normalize_url("https://example.com/page#section").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_query_kept_as_is() {
        let result = normalize_url("https://example.com/page?b=2&a=1&utm_source=x").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page?b=2&a=1&utm_source=x");
    }

    #[test]
    fn test_empty_query_dropped() {
        let result = normalize_url("https://example.com/page?").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_default_port_stripped() {
        assert_eq!(
            normalize_url("https://example.com:443/a").unwrap().as_str(),
            "https://example.com/a"
        );
        assert_eq!(
            normalize_url("http://example.com:80/a").unwrap().as_str(),
            "http://example.com/a"
        );
        assert_eq!(
            normalize_url("http://example.com:8080/a").unwrap().as_str(),
            "http://example.com:8080/a"
        );
    }

    #[test]
    fn test_normalize_path_with_dots() {
        let result = normalize_url("https://example.com/a/../b/./c").unwrap();
        assert_eq!(result.as_str(), "https://example.com/b/c");
    }

    #[test]
    fn test_lowercase_host_not_path() {
        let result = normalize_url("https://EXAMPLE.COM/Page").unwrap();
        assert_eq!(result.as_str(), "https://example.com/Page");
    }

    #[test]
    fn test_multiple_slashes() {
        let result = normalize_url("https://example.com///path//to///page").unwrap();
        assert_eq!(result.as_str(), "https://example.com/path/to/page");
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_url("ftp://example.com/page");
        assert!(matches!(result, Err(UrlError::InvalidScheme(_))));
    }

    #[test]
    fn test_malformed_url() {
        assert!(normalize_url("not a url").is_err());
    }

    #[test]
    fn test_empty_path_becomes_root() {
        let result = normalize_url("https://example.com").unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn test_resolve_relative_links() {
        let base = Url::parse("https://example.test/blog/post").unwrap();

        assert_eq!(
            resolve_url(&base, "/about").unwrap().as_str(),
            "https://example.test/about"
        );
        assert_eq!(
            resolve_url(&base, "other#frag").unwrap().as_str(),
            "https://example.test/blog/other"
        );
        assert_eq!(
            resolve_url(&base, "../contact/").unwrap().as_str(),
            "https://example.test/contact"
        );
        assert_eq!(
            resolve_url(&base, "//cdn.example.test/x").unwrap().as_str(),
            "https://cdn.example.test/x"
        );
    }

    #[test]
    fn test_resolve_skips_non_page_links() {
        let base = Url::parse("https://example.test/").unwrap();

        for href in [
            "",
            "#top",
            "javascript:void(0)",
            "mailto:me@example.test",
            "tel:+123",
            "data:text/plain,hi",
            "ftp://example.test/file",
        ] {
            assert!(resolve_url(&base, href).is_none(), "resolved {:?}", href);
        }
    }
}
