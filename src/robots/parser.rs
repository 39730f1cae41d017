//! Robots.txt parser implementation
//!
//! Allow/disallow matching is delegated to the robotstxt crate; crawl-delay is
//! not part of that crate's matcher and is parsed here per user-agent group.

use chrono::{DateTime, Utc};
use robotstxt::DefaultMatcher;
use std::time::Duration;

/// Crawl-delay values above this many seconds are ignored as malformed
const MAX_CRAWL_DELAY_SECS: f64 = 86_400.0;

/// Robots.txt rules for one origin
///
/// Unknown directives and garbage lines are ignored, so any body parses.
#[derive(Debug, Clone)]
pub struct RobotsRules {
    /// Origin the rules apply to (`scheme://host[:port]`)
    origin: String,
    /// Raw robots.txt content (empty string means allow all)
    content: String,
    /// Whether to allow all (true = allow all, false = parse content)
    allow_all: bool,
    /// When the rules were fetched
    fetched_at: DateTime<Utc>,
    /// How long the rules stay valid; None lasts for the whole crawl
    ttl: Option<chrono::Duration>,
}

impl RobotsRules {
    /// Creates rules from raw robots.txt content
    ///
    /// # Arguments
    ///
    /// * `origin` - The origin the file was fetched from
    /// * `content` - The raw robots.txt file content
    pub fn from_content(origin: &str, content: &str) -> Self {
        Self {
            origin: origin.to_string(),
            content: content.to_string(),
            allow_all: false,
            fetched_at: Utc::now(),
            ttl: None,
        }
    }

    /// Creates permissive rules that allow everything
    ///
    /// This is used when robots.txt is missing or cannot be fetched.
    pub fn allow_all(origin: &str) -> Self {
        Self {
            origin: origin.to_string(),
            content: String::new(),
            allow_all: true,
            fetched_at: Utc::now(),
            ttl: None,
        }
    }

    /// Sets an expiry on these rules
    pub fn with_ttl(mut self, ttl: Option<chrono::Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Origin these rules were fetched for
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// When the rules were fetched
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Returns true if the rules are permissive defaults rather than a parsed file
    pub fn is_allow_all(&self) -> bool {
        self.allow_all
    }

    /// Returns true once the TTL has elapsed
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match self.ttl {
            Some(ttl) => now - self.fetched_at > ttl,
            None => false,
        }
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// # Arguments
    ///
    /// * `url` - The absolute URL (or path) to check
    /// * `user_agent` - The robots.txt product token of the crawler
    ///
    /// # Returns
    ///
    /// * `true` - If the URL is allowed
    /// * `false` - If the URL is disallowed
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.allow_all || self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Gets the crawl delay for a specific user agent
    ///
    /// A group naming the agent wins over the `*` group. Consecutive
    /// `User-agent` lines form one group; the group closes at the first
    /// other directive.
    ///
    /// # Returns
    ///
    /// * `Some(Duration)` - The crawl delay
    /// * `None` - If no applicable, well-formed crawl delay is specified
    pub fn crawl_delay(&self, user_agent: &str) -> Option<Duration> {
        if self.allow_all || self.content.is_empty() {
            return None;
        }

        let normalized_agent = user_agent.to_lowercase();
        let mut group_agents: Vec<String> = Vec::new();
        let mut in_agent_lines = false;
        let mut delay_for_wildcard: Option<f64> = None;
        let mut delay_for_agent: Option<f64> = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    if !in_agent_lines {
                        group_agents.clear();
                        in_agent_lines = true;
                    }
                    group_agents.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    in_agent_lines = false;
                    let Ok(delay) = value.parse::<f64>() else {
                        continue;
                    };
                    if !(0.0..=MAX_CRAWL_DELAY_SECS).contains(&delay) {
                        continue;
                    }
                    if group_agents
                        .iter()
                        .any(|ua| ua != "*" && normalized_agent.contains(ua.as_str()))
                    {
                        delay_for_agent = Some(delay);
                    } else if group_agents.iter().any(|ua| ua == "*") {
                        delay_for_wildcard = Some(delay);
                    }
                }
                _ => in_agent_lines = false,
            }
        }

        delay_for_agent
            .or(delay_for_wildcard)
            .and_then(|delay| Duration::try_from_secs_f64(delay).ok())
    }
}
