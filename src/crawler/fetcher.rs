//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests with a per-request timeout
//! - Manual redirect handling (3xx responses are returned, not followed)
//! - Error classification into transient and permanent failures

use crate::config::UserAgentConfig;
use crate::state::FetchStatus;
use reqwest::{header, redirect::Policy, Client};
use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Response of a fetch that produced a status below 400
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP status code
    pub status: u16,
    /// Content-Type header value
    pub content_type: Option<String>,
    /// Location header value for redirects
    pub location: Option<String>,
    /// Raw body bytes
    pub body: Vec<u8>,
}

/// Kind of network-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    Timeout,
    Dns,
    Connection,
    Other,
}

impl NetworkErrorKind {
    /// Whether a retry may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, NetworkErrorKind::Timeout | NetworkErrorKind::Connection)
    }
}

/// Failure of a single fetch attempt
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error ({kind:?}): {message}")]
    Network {
        kind: NetworkErrorKind,
        message: String,
    },

    #[error("HTTP error: {status}")]
    Http { status: u16 },

    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Whether the attempt should be retried
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network { kind, .. } => kind.is_transient(),
            FetchError::Http { .. } | FetchError::Cancelled => false,
        }
    }

    /// Status recorded on the page when this is the final outcome
    pub fn to_status(&self) -> FetchStatus {
        match self {
            FetchError::Network { kind, message } => match kind {
                NetworkErrorKind::Timeout => FetchStatus::Timeout,
                NetworkErrorKind::Dns => FetchStatus::Dns,
                NetworkErrorKind::Connection => FetchStatus::Connection,
                NetworkErrorKind::Other => FetchStatus::Failed(message.clone()),
            },
            FetchError::Http { status } => FetchStatus::Http(*status),
            FetchError::Cancelled => FetchStatus::Failed("cancelled".to_string()),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Network {
            kind: classify_error(&e),
            message: e.to_string(),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Per-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use crawlscope::config::UserAgentConfig;
/// use crawlscope::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(15)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::none()) // Redirects are recorded as pages
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL once
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx | `Ok` with body |
/// | 3xx | `Ok` with `location`, body not read |
/// | >= 400 | `Err(Http)` |
/// | Timeout | `Err(Network(Timeout))` |
/// | DNS failure | `Err(Network(Dns))` |
/// | Refused / reset | `Err(Network(Connection))` |
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
pub async fn fetch_url(client: &Client, url: &Url) -> Result<FetchResponse, FetchError> {
    let response = client.get(url.clone()).send().await?;
    let status = response.status();

    if status.as_u16() >= 400 {
        return Err(FetchError::Http {
            status: status.as_u16(),
        });
    }

    let content_type = header_string(&response, header::CONTENT_TYPE);

    if status.is_redirection() {
        return Ok(FetchResponse {
            status: status.as_u16(),
            content_type,
            location: header_string(&response, header::LOCATION),
            body: Vec::new(),
        });
    }

    let body = response.bytes().await?;

    Ok(FetchResponse {
        status: status.as_u16(),
        content_type,
        location: None,
        body: body.to_vec(),
    })
}

fn header_string(response: &reqwest::Response, name: header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Classifies a reqwest error
fn classify_error(e: &reqwest::Error) -> NetworkErrorKind {
    if e.is_timeout() {
        return NetworkErrorKind::Timeout;
    }

    let mut source: Option<&(dyn StdError + 'static)> = e.source();
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            match io.kind() {
                std::io::ErrorKind::TimedOut => return NetworkErrorKind::Timeout,
                std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::BrokenPipe => return NetworkErrorKind::Connection,
                _ => {}
            }
        }
        let message = err.to_string().to_lowercase();
        if message.contains("dns error") || message.contains("failed to lookup address") {
            return NetworkErrorKind::Dns;
        }
        source = err.source();
    }

    if e.is_connect() || e.is_body() {
        NetworkErrorKind::Connection
    } else {
        NetworkErrorKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> Client {
        build_http_client(&UserAgentConfig::default(), Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&UserAgentConfig::default(), Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_transient_kinds() {
        assert!(NetworkErrorKind::Timeout.is_transient());
        assert!(NetworkErrorKind::Connection.is_transient());
        assert!(!NetworkErrorKind::Dns.is_transient());
        assert!(!FetchError::Http { status: 503 }.is_transient());
    }

    #[test]
    fn test_error_to_status() {
        assert_eq!(FetchError::Http { status: 404 }.to_status(), FetchStatus::Http(404));
        let timeout = FetchError::Network {
            kind: NetworkErrorKind::Timeout,
            message: "timed out".to_string(),
        };
        assert_eq!(timeout.to_status(), FetchStatus::Timeout);
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_bytes("<html><title>Hi</title></html>"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let response = fetch_url(&client(), &url).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(
            response.content_type.as_deref(),
            Some("text/html; charset=utf-8")
        );
        assert!(String::from_utf8_lossy(&response.body).contains("Hi"));
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
        let err = fetch_url(&client(), &url).await.unwrap_err();

        assert!(matches!(err, FetchError::Http { status: 404 }));
    }

    #[tokio::test]
    async fn test_redirect_not_followed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/old", server.uri())).unwrap();
        let response = fetch_url(&client(), &url).await.unwrap();

        assert_eq!(response.status, 301);
        assert_eq!(response.location.as_deref(), Some("/new"));
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_classified() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let client =
            build_http_client(&UserAgentConfig::default(), Duration::from_millis(200)).unwrap();
        let url = Url::parse(&server.uri()).unwrap();
        let err = fetch_url(&client, &url).await.unwrap_err();

        assert!(matches!(
            err,
            FetchError::Network {
                kind: NetworkErrorKind::Timeout,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_classified() {
        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        let err = fetch_url(&client(), &url).await.unwrap_err();

        assert!(matches!(
            err,
            FetchError::Network {
                kind: NetworkErrorKind::Connection,
                ..
            }
        ));
    }
}
