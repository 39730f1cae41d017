use std::time::{Duration, Instant};

/// Tracks request timing for one host during a crawl
#[derive(Debug, Clone, Default)]
pub struct HostState {
    /// Number of requests started against this host in the current crawl
    pub request_count: u32,

    /// When the last request to this host started
    pub last_request_time: Option<Instant>,
}

impl HostState {
    /// Creates a new HostState with no requests recorded
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks if a request can be made to this host
    ///
    /// # Arguments
    ///
    /// * `delay` - Minimum time between two request starts on this host
    /// * `now` - The current time instant
    pub fn can_request(&self, delay: Duration, now: Instant) -> bool {
        self.time_until_next_request(delay, now).is_none()
    }

    /// Records that a request to this host started at `now`
    pub fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(now);
    }

    /// Calculates the time until the next request can be made
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    pub fn time_until_next_request(&self, delay: Duration, now: Instant) -> Option<Duration> {
        let last = self.last_request_time?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < delay {
            Some(delay - elapsed)
        } else {
            None
        }
    }
}
