//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching robots.txt files.
//! A robots.txt that cannot be fetched never stops a crawl; the origin is
//! treated as allowing everything.

mod cache;
mod parser;

pub use cache::RobotsCache;
pub use parser::RobotsRules;

use thiserror::Error;

/// Failure to retrieve a robots.txt file
#[derive(Debug, Error)]
pub enum RobotsFetchError {
    #[error("robots.txt request to {origin} failed: {source}")]
    Network {
        origin: String,
        source: reqwest::Error,
    },

    #[error("robots.txt on {origin} returned HTTP {status}")]
    ServerError { origin: String, status: u16 },
}

/// Redirect hops followed for robots.txt before treating it as missing
const MAX_ROBOTS_REDIRECTS: usize = 5;

/// Fetches robots.txt for an origin
///
/// Redirects are followed by hand because the crawl client never follows
/// them on its own.
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `origin` - `scheme://host[:port]` of the site
///
/// # Returns
///
/// * `Ok(Some(String))` - The file body
/// * `Ok(None)` - The site has no robots.txt (any non-5xx error status, or a redirect loop)
/// * `Err(RobotsFetchError)` - Network failure or server error
pub async fn fetch_robots(
    client: &reqwest::Client,
    origin: &str,
) -> Result<Option<String>, RobotsFetchError> {
    let network = |source| RobotsFetchError::Network {
        origin: origin.to_string(),
        source,
    };

    let mut robots_url = format!("{}/robots.txt", origin.trim_end_matches('/'));

    for _ in 0..=MAX_ROBOTS_REDIRECTS {
        let response = client.get(&robots_url).send().await.map_err(network)?;
        let status = response.status();

        if status.is_redirection() {
            let target = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|location| location.to_str().ok())
                .and_then(|location| response.url().join(location).ok());
            match target {
                Some(target) => {
                    tracing::debug!("robots.txt for {} redirects to {}", origin, target);
                    robots_url = target.to_string();
                    continue;
                }
                None => return Ok(None),
            }
        }

        if status.is_server_error() {
            return Err(RobotsFetchError::ServerError {
                origin: origin.to_string(),
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            return Ok(None);
        }

        let body = response.text().await.map_err(network)?;
        return Ok(Some(body));
    }

    tracing::debug!("Too many robots.txt redirects for {}", origin);
    Ok(None)
}
