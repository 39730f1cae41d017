use url::Url;

/// Extracts the host from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (which shouldn't happen for valid HTTP(S) URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use crawlscope::url::extract_host;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_host(&url), Some("example.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Key used for per-host politeness bookkeeping
///
/// Includes an explicit port so two servers sharing an address are
/// rate-limited independently.
pub fn host_key(url: &Url) -> String {
    let host = extract_host(url).unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    }
}

/// Filter deciding which discovered URLs a crawl may follow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainScope {
    seed_host: String,
    same_domain_only: bool,
}

impl DomainScope {
    /// Builds the scope for a crawl seeded at `seed`
    pub fn new(seed: &Url, same_domain_only: bool) -> Self {
        Self {
            seed_host: extract_host(seed).unwrap_or_default(),
            same_domain_only,
        }
    }

    /// Host of the seed URL
    pub fn seed_host(&self) -> &str {
        &self.seed_host
    }

    /// Returns true if the crawl may follow `url`
    ///
    /// With same-domain-only set, the lower-cased host must equal the seed's
    /// host exactly; subdomains are different hosts.
    pub fn allows(&self, url: &Url) -> bool {
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        if !self.same_domain_only {
            return true;
        }
        extract_host(url).as_deref() == Some(self.seed_host.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_subdomain() {
        let url = Url::parse("https://blog.example.com/post").unwrap();
        assert_eq!(extract_host(&url), Some("blog.example.com".to_string()));
    }

    #[test]
    fn test_extract_with_port() {
        let url = Url::parse("https://example.com:8080/").unwrap();
        assert_eq!(extract_host(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_host_key_includes_port() {
        let url = Url::parse("http://127.0.0.1:8080/a").unwrap();
        assert_eq!(host_key(&url), "127.0.0.1:8080");

        let url = Url::parse("https://example.com:443/a").unwrap();
        assert_eq!(host_key(&url), "example.com");
    }

    #[test]
    fn test_same_domain_scope() {
        let seed = Url::parse("https://example.test/").unwrap();
        let scope = DomainScope::new(&seed, true);

        assert!(scope.allows(&Url::parse("https://example.test/about").unwrap()));
        assert!(scope.allows(&Url::parse("http://EXAMPLE.test/x").unwrap()));
        assert!(!scope.allows(&Url::parse("https://blog.example.test/").unwrap()));
        assert!(!scope.allows(&Url::parse("https://other.test/").unwrap()));
    }

    #[test]
    fn test_open_scope_still_requires_http() {
        let seed = Url::parse("https://example.test/").unwrap();
        let scope = DomainScope::new(&seed, false);

        assert!(scope.allows(&Url::parse("https://other.test/").unwrap()));
        assert!(!scope.allows(&Url::parse("ftp://other.test/").unwrap()));
    }
}
