use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a page within one crawl, assigned in commit order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(pub u32);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome of fetching a URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FetchStatus {
    /// A response was received with this status code
    Http(u16),
    /// The request timed out on every attempt
    Timeout,
    /// The host name did not resolve
    Dns,
    /// The connection was refused or reset
    Connection,
    /// Any other transport failure
    Failed(String),
}

impl FetchStatus {
    /// HTTP status code, if a response was received
    pub fn code(&self) -> Option<u16> {
        match self {
            Self::Http(code) => Some(*code),
            _ => None,
        }
    }

    /// Returns true for 2xx responses
    pub fn is_success(&self) -> bool {
        matches!(self.code(), Some(200..=299))
    }

    /// Returns true for 3xx responses
    pub fn is_redirect(&self) -> bool {
        matches!(self.code(), Some(300..=399))
    }

    /// Returns true for network failures and responses with status >= 400
    pub fn is_broken(&self) -> bool {
        match self {
            Self::Http(code) => *code >= 400,
            _ => true,
        }
    }

    /// Returns true if no response was received at all
    pub fn is_network_failure(&self) -> bool {
        self.code().is_none()
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(code) => write!(f, "{}", code),
            Self::Timeout => write!(f, "timeout"),
            Self::Dns => write!(f, "dns error"),
            Self::Connection => write!(f, "connection error"),
            Self::Failed(msg) => write!(f, "failed: {}", msg),
        }
    }
}

/// One heading tag in document order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    /// 1 for `<h1>` through 6 for `<h6>`
    pub level: u8,
    pub text: String,
}

/// An image reference with its alt attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Absolute image URL, or the raw `src` when it cannot be resolved
    pub src: String,
    /// None when the attribute is absent
    pub alt: Option<String>,
}

impl ImageRef {
    /// Returns true if the alt text is missing or blank
    pub fn missing_alt(&self) -> bool {
        self.alt.as_deref().map_or(true, |alt| alt.trim().is_empty())
    }
}

/// Fields extracted from a page body
///
/// Failed fetches and non-HTML responses carry the empty default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    pub title: String,
    pub meta_description: String,
    /// `Some("")` records a canonical link element with an empty href
    pub canonical: Option<String>,
    pub headings: Vec<Heading>,
    pub body_text: String,
    pub images: Vec<ImageRef>,
    /// Absolute, normalized, deduplicated, in document order
    pub outlinks: Vec<String>,
    /// `<meta name="robots" content="noindex">` was present
    pub noindex: bool,
}

/// Immutable snapshot of one fetched URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub url: String,
    pub status: FetchStatus,
    pub fetched_at: DateTime<Utc>,
    pub content_type: Option<String>,
    pub latency_ms: u64,
    /// Resolved `Location` of a redirect response
    pub redirect_target: Option<String>,
    #[serde(flatten)]
    pub content: PageContent,
    /// Hash of the cleaned body text; None when there is no text
    pub fingerprint: Option<String>,
    /// First page committed with the same fingerprint
    pub duplicate_of: Option<PageId>,
}

impl Page {
    /// Number of whitespace-separated words in the body text
    pub fn word_count(&self) -> usize {
        self.content.body_text.split_whitespace().count()
    }

    /// Number of `<h1>` headings
    pub fn h1_count(&self) -> usize {
        self.content.headings.iter().filter(|h| h.level == 1).count()
    }

    /// Returns true if this page shares its fingerprint with an earlier page
    pub fn is_duplicate(&self) -> bool {
        self.duplicate_of.is_some()
    }

    /// Returns true if the response declared an HTML content type
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map_or(false, |ct| ct.to_ascii_lowercase().contains("html"))
    }

    /// 2xx response without a noindex directive, whatever its content type
    pub fn is_indexable(&self) -> bool {
        self.status.is_success() && !self.content.noindex
    }
}

/// Lifecycle state of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlState {
    Running,
    Paused,
    Stopped,
    Done,
}

impl CrawlState {
    /// Returns true once the crawl can make no further progress
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Stopped | Self::Done)
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Done => "done",
        };
        f.write_str(s)
    }
}

/// Point-in-time view of a crawl returned by crawl status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlProgress {
    pub pages_fetched: usize,
    pub pages_queued: usize,
    pub state: CrawlState,
}
