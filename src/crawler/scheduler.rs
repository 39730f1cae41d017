//! Polite scheduler for per-host rate limiting
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore
//! - Per-host in-flight caps
//! - Minimum spacing between request starts on one host
//! - Integrating robots.txt crawl delays
//!
//! Every host has its own wait queue, so a worker sleeping out one host's
//! delay never holds a global permit or blocks workers bound for other hosts.

use crate::state::HostState;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Per-host wait queue
struct HostSlot {
    /// Caps simultaneous in-flight fetches to the host
    in_flight: Arc<Semaphore>,
    /// Held while a worker waits out the host delay; tokio's mutex is FIFO
    state: tokio::sync::Mutex<HostState>,
}

/// Permission to start one fetch, released on drop
#[derive(Debug)]
pub struct SchedulerToken {
    host: String,
    waited: Duration,
    _host_permit: OwnedSemaphorePermit,
    _global_permit: OwnedSemaphorePermit,
}

impl SchedulerToken {
    /// Host this token was issued for
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Time spent waiting for the token
    pub fn waited(&self) -> Duration {
        self.waited
    }
}

/// Enforces politeness across all fetch workers of a crawl
pub struct PoliteScheduler {
    /// Global semaphore for limiting concurrent fetches
    global: Arc<Semaphore>,
    max_per_host: usize,
    base_delay: Duration,
    hosts: Mutex<HashMap<String, Arc<HostSlot>>>,
}

impl PoliteScheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `global_limit` - Maximum simultaneous fetches across all hosts
    /// * `max_per_host` - Maximum simultaneous fetches to one host
    /// * `base_delay` - Configured minimum time between request starts on one host
    pub fn new(global_limit: usize, max_per_host: usize, base_delay: Duration) -> Self {
        Self {
            global: Arc::new(Semaphore::new(global_limit.max(1))),
            max_per_host: max_per_host.max(1),
            base_delay,
            hosts: Mutex::new(HashMap::new()),
        }
    }

    /// Waits until a fetch to `host` may start
    ///
    /// Waiters for one host are served in arrival order. The wait observes
    /// `cancel` at every suspension point.
    ///
    /// # Arguments
    ///
    /// * `host` - Politeness key of the target host
    /// * `robots_delay` - Crawl delay from robots.txt, if any
    /// * `cancel` - Crawl cancellation token
    ///
    /// # Returns
    ///
    /// * `Some(SchedulerToken)` - The fetch may start now
    /// * `None` - The crawl was cancelled while waiting
    pub async fn acquire(
        &self,
        host: &str,
        robots_delay: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Option<SchedulerToken> {
        let started = Instant::now();
        let slot = self.slot(host);
        let delay = effective_delay(self.base_delay, robots_delay);

        let host_permit = tokio::select! {
            permit = Arc::clone(&slot.in_flight).acquire_owned() => permit.ok()?,
            _ = cancel.cancelled() => return None,
        };

        let mut state = tokio::select! {
            state = slot.state.lock() => state,
            _ = cancel.cancelled() => return None,
        };

        if let Some(wait) = state.time_until_next_request(delay, Instant::now().into_std()) {
            tracing::trace!("Waiting {:?} before next request to {}", wait, host);
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = cancel.cancelled() => return None,
            }
        }

        let global_permit = tokio::select! {
            permit = Arc::clone(&self.global).acquire_owned() => permit.ok()?,
            _ = cancel.cancelled() => return None,
        };

        state.record_request(Instant::now().into_std());
        drop(state);

        Some(SchedulerToken {
            host: host.to_string(),
            waited: started.elapsed(),
            _host_permit: host_permit,
            _global_permit: global_permit,
        })
    }

    /// Returns the permits held by `token`
    pub fn release(&self, token: SchedulerToken) {
        tracing::trace!("Released fetch slot for {}", token.host);
        drop(token);
    }

    /// Number of requests started against `host` so far
    pub async fn request_count(&self, host: &str) -> u32 {
        let slot = self.slot(host);
        let state = slot.state.lock().await;
        state.request_count
    }

    /// Number of global fetch slots currently free
    pub fn available_permits(&self) -> usize {
        self.global.available_permits()
    }

    fn slot(&self, host: &str) -> Arc<HostSlot> {
        let mut hosts = match self.hosts.lock() {
            Ok(hosts) => hosts,
            Err(poisoned) => poisoned.into_inner(),
        };
        let max_per_host = self.max_per_host;
        Arc::clone(hosts.entry(host.to_string()).or_insert_with(|| {
            Arc::new(HostSlot {
                in_flight: Arc::new(Semaphore::new(max_per_host)),
                state: tokio::sync::Mutex::new(HostState::new()),
            })
        }))
    }
}

/// Calculates the effective delay for a host
///
/// This takes the maximum of:
/// - The configured per-host delay
/// - The robots.txt crawl delay (if specified)
pub fn effective_delay(configured: Duration, robots_delay: Option<Duration>) -> Duration {
    std::cmp::max(configured, robots_delay.unwrap_or(Duration::ZERO))
}
