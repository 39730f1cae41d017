//! Robots.txt caching implementation
//!
//! Rules are fetched lazily on the first query for an origin and kept for the
//! configured TTL (by default the whole crawl run).

use crate::robots::{fetch_robots, RobotsRules};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use url::Url;

/// Per-crawl cache of robots.txt rules keyed by origin
///
/// Lookups take a read lock only long enough to clone an `Arc`; fetching
/// happens with no lock held. Two workers racing on a cold origin may both
/// fetch, and the last insert wins.
pub struct RobotsCache {
    client: reqwest::Client,
    user_agent: String,
    ttl: Option<chrono::Duration>,
    entries: RwLock<HashMap<String, Arc<RobotsRules>>>,
}

impl RobotsCache {
    /// Creates an empty cache
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client used to fetch robots.txt
    /// * `user_agent` - Product token matched against `User-agent` groups
    pub fn new(client: reqwest::Client, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
            ttl: None,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Expires cached rules after `ttl` instead of keeping them for the crawl
    pub fn with_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Checks whether the crawler may fetch `url`
    pub async fn allowed(&self, url: &Url) -> bool {
        let rules = self.rules_for(url).await;
        rules.is_allowed(url.as_str(), &self.user_agent)
    }

    /// Crawl delay declared for the crawler on `url`'s origin
    pub async fn crawl_delay(&self, url: &Url) -> Option<Duration> {
        let rules = self.rules_for(url).await;
        rules.crawl_delay(&self.user_agent)
    }

    /// Number of origins with cached rules
    pub fn len(&self) -> usize {
        match self.entries.read() {
            Ok(entries) => entries.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Returns true if no origin has been looked up yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns cached rules for `url`'s origin, fetching them on a miss
    pub async fn rules_for(&self, url: &Url) -> Arc<RobotsRules> {
        let origin = url.origin().ascii_serialization();

        if let Some(rules) = self.cached(&origin) {
            return rules;
        }

        let rules = match fetch_robots(&self.client, &origin).await {
            Ok(Some(content)) => {
                tracing::debug!("Loaded robots.txt for {}", origin);
                RobotsRules::from_content(&origin, &content)
            }
            Ok(None) => {
                tracing::debug!("No robots.txt for {}, allowing all", origin);
                RobotsRules::allow_all(&origin)
            }
            Err(e) => {
                tracing::warn!("{}; allowing all paths on {}", e, origin);
                RobotsRules::allow_all(&origin)
            }
        };

        let rules = Arc::new(rules.with_ttl(self.ttl));
        let mut entries = match self.entries.write() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.insert(origin, Arc::clone(&rules));
        rules
    }

    fn cached(&self, origin: &str) -> Option<Arc<RobotsRules>> {
        let entries = match self.entries.read() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries
            .get(origin)
            .filter(|rules| !rules.is_stale(Utc::now()))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> reqwest::Client {
        reqwest::Client::new()
    }

    #[tokio::test]
    async fn test_fetches_once_per_origin() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("User-agent: *\nDisallow: /private/\nCrawl-delay: 1"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let cache = RobotsCache::new(client(), "crawlscope");
        let base = Url::parse(&server.uri()).unwrap();

        assert!(cache.allowed(&base.join("/public").unwrap()).await);
        assert!(!cache.allowed(&base.join("/private/x").unwrap()).await);
        assert_eq!(
            cache.crawl_delay(&base).await,
            Some(Duration::from_secs(1))
        );
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_robots_allows_all() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let cache = RobotsCache::new(client(), "crawlscope");
        let url = Url::parse(&server.uri()).unwrap().join("/anything").unwrap();

        assert!(cache.allowed(&url).await);
        assert_eq!(cache.crawl_delay(&url).await, None);
    }

    #[tokio::test]
    async fn test_server_error_allows_all() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let cache = RobotsCache::new(client(), "crawlscope");
        let url = Url::parse(&server.uri()).unwrap().join("/x").unwrap();

        assert!(cache.allowed(&url).await);
        assert!(cache.rules_for(&url).await.is_allow_all());
    }

    #[tokio::test]
    async fn test_redirected_robots_followed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "/site/robots.txt"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/site/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private/"))
            .expect(1)
            .mount(&server)
            .await;

        // Same redirect policy as the crawl client
        let no_redirects = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();
        let cache = RobotsCache::new(no_redirects, "crawlscope");
        let base = Url::parse(&server.uri()).unwrap();

        assert!(!cache.allowed(&base.join("/private/x").unwrap()).await);
        assert!(cache.allowed(&base.join("/public").unwrap()).await);
    }

    #[tokio::test]
    async fn test_redirect_loop_allows_all() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/robots.txt"))
            .mount(&server)
            .await;

        let no_redirects = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();
        let cache = RobotsCache::new(no_redirects, "crawlscope");
        let url = Url::parse(&server.uri()).unwrap().join("/x").unwrap();

        assert!(cache.allowed(&url).await);
        assert!(cache.rules_for(&url).await.is_allow_all());
    }

    #[tokio::test]
    async fn test_unreachable_host_allows_all() {
        let cache = RobotsCache::new(client(), "crawlscope");
        // Port 9 (discard) on loopback is expected to refuse connections
        let url = Url::parse("http://127.0.0.1:9/page").unwrap();

        assert!(cache.allowed(&url).await);
    }
}
