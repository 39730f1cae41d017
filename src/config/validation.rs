use crate::config::types::{CrawlJob, UserAgentConfig};
use crate::url::normalize_url;
use crate::ConfigError;
use url::Url;

/// Longest accepted per-host delay, in seconds
const MAX_PER_HOST_DELAY_SECS: f64 = 3600.0;

/// Validates a crawl job and returns its normalized seed URL
///
/// Everything checked here is fatal at crawl start; nothing else a crawl runs
/// into later can abort it.
///
/// # Arguments
///
/// * `job` - The job to validate
///
/// # Returns
///
/// * `Ok(Url)` - The normalized start URL
/// * `Err(ConfigError)` - The first problem found
pub fn validate_job(job: &CrawlJob) -> Result<Url, ConfigError> {
    let seed = normalize_url(&job.start_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid start URL '{}': {}", job.start_url, e))
    })?;

    if job.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            job.max_pages
        )));
    }

    if job.concurrency < 1 || job.concurrency > 256 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 256, got {}",
            job.concurrency
        )));
    }

    if !(0.0..=MAX_PER_HOST_DELAY_SECS).contains(&job.per_host_delay) {
        return Err(ConfigError::Validation(format!(
            "per-host-delay must be between 0 and {} seconds, got {}",
            MAX_PER_HOST_DELAY_SECS, job.per_host_delay
        )));
    }

    if job.search_fields.is_empty() {
        return Err(ConfigError::Validation(
            "search-fields must name at least one field".to_string(),
        ));
    }

    if job.request_timeout < 1 {
        return Err(ConfigError::Validation(
            "request-timeout must be >= 1 second".to_string(),
        ));
    }

    if job.max_retries > 5 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be <= 5, got {}",
            job.max_retries
        )));
    }

    if job.frontier_capacity < 1 {
        return Err(ConfigError::Validation(
            "frontier-capacity must be >= 1".to_string(),
        ));
    }

    if job.max_per_host < 1 {
        return Err(ConfigError::Validation(format!(
            "max-per-host must be >= 1, got {}",
            job.max_per_host
        )));
    }

    Ok(seed)
}

/// Validates user agent configuration
pub fn validate_user_agent(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Crawler name doubles as the robots.txt product token
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact-email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
