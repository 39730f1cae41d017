//! Bounded URL frontier
//!
//! Entries are kept in per-host FIFO queues served round-robin, so a host with
//! a deep backlog cannot monopolize the worker pool while other hosts have
//! work ready. A URL is admitted at most once per crawl, and the number of
//! admitted URLs never exceeds the page limit. URLs offered while the budget
//! is spent wait in a deferred list and are admitted when an abandoned entry
//! returns its slot.

use crate::url::{host_key, DomainScope};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use url::Url;

/// A URL waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Normalized absolute URL
    pub url: Url,
    /// Link hops from the seed
    pub depth: u32,
    /// URL of the page the link was found on
    pub source: Option<String>,
}

impl FrontierEntry {
    pub fn seed(url: Url) -> Self {
        Self {
            url,
            depth: 0,
            source: None,
        }
    }

    /// Entry for a link found on the page fetched for `source`
    pub fn discovered(url: Url, source: &FrontierEntry) -> Self {
        Self {
            url,
            depth: source.depth + 1,
            source: Some(source.url.to_string()),
        }
    }
}

/// Result of offering a URL to the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Queued,
    /// Held until an abandoned entry frees a budget slot
    Deferred,
    AlreadySeen,
    OutOfScope,
    BudgetExhausted,
    Cancelled,
}

#[derive(Debug, Default)]
struct Inner {
    queues: HashMap<String, VecDeque<FrontierEntry>>,
    /// Hosts with queued entries, in service order
    ring: VecDeque<String>,
    seen: HashSet<String>,
    /// Seen but not admitted, in discovery order
    deferred: VecDeque<FrontierEntry>,
    admitted: usize,
    queued: usize,
    in_flight: usize,
}

impl Inner {
    fn push(&mut self, entry: FrontierEntry) {
        let host = host_key(&entry.url);
        let queue = self.queues.entry(host.clone()).or_default();
        if queue.is_empty() {
            self.ring.push_back(host);
        }
        queue.push_back(entry);
        self.queued += 1;
    }

    fn pop(&mut self) -> Option<FrontierEntry> {
        let host = self.ring.pop_front()?;
        let queue = self.queues.get_mut(&host)?;
        let entry = queue.pop_front()?;
        if queue.is_empty() {
            self.queues.remove(&host);
        } else {
            self.ring.push_back(host);
        }
        self.queued -= 1;
        Some(entry)
    }

    /// Admits deferred entries while budget and capacity allow
    fn promote_deferred(&mut self, max_pages: usize, capacity: usize) {
        while self.admitted < max_pages && self.queued < capacity {
            let Some(entry) = self.deferred.pop_front() else {
                break;
            };
            tracing::debug!("Admitted deferred {}", entry.url);
            self.admitted += 1;
            self.push(entry);
        }
    }
}

/// Pending-URL queue for one crawl
pub struct Frontier {
    inner: Mutex<Inner>,
    scope: DomainScope,
    max_pages: usize,
    capacity: usize,
    changed: Notify,
    cancel: CancellationToken,
}

impl Frontier {
    /// Creates an empty frontier
    ///
    /// # Arguments
    ///
    /// * `scope` - Domain filter applied on enqueue
    /// * `max_pages` - Total number of URLs that may ever be admitted
    /// * `capacity` - Maximum number of entries queued at once
    /// * `cancel` - Crawl cancellation token; wakes every waiter
    pub fn new(
        scope: DomainScope,
        max_pages: usize,
        capacity: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            scope,
            max_pages,
            capacity: capacity.max(1),
            changed: Notify::new(),
            cancel,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Offers an entry to the frontier
    ///
    /// Waits while the queue is at capacity. The URL is reserved before
    /// waiting, so a concurrent offer of the same URL reports `AlreadySeen`.
    pub async fn enqueue(&self, entry: FrontierEntry) -> EnqueueOutcome {
        if self.cancel.is_cancelled() {
            return EnqueueOutcome::Cancelled;
        }
        if !self.scope.allows(&entry.url) {
            tracing::debug!("Out of scope: {}", entry.url);
            return EnqueueOutcome::OutOfScope;
        }

        {
            let mut inner = self.lock();
            if inner.seen.contains(entry.url.as_str()) {
                return EnqueueOutcome::AlreadySeen;
            }
            if inner.admitted >= self.max_pages {
                if inner.deferred.len() >= self.capacity {
                    return EnqueueOutcome::BudgetExhausted;
                }
                inner.seen.insert(entry.url.to_string());
                inner.deferred.push_back(entry);
                return EnqueueOutcome::Deferred;
            }
            inner.seen.insert(entry.url.to_string());
            inner.admitted += 1;
        }

        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut inner = self.lock();
                if inner.queued < self.capacity {
                    tracing::debug!("Queued {} (depth {})", entry.url, entry.depth);
                    inner.push(entry);
                    drop(inner);
                    self.changed.notify_waiters();
                    return EnqueueOutcome::Queued;
                }
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = self.cancel.cancelled() => return EnqueueOutcome::Cancelled,
            }
        }
    }

    /// Takes the next entry to fetch
    ///
    /// Waits while the queue is empty but fetches are still in flight, since
    /// they may discover more links.
    ///
    /// # Returns
    ///
    /// * `Some(FrontierEntry)` - The caller must later call `complete` or `abandon`
    /// * `None` - The crawl is drained or cancelled
    pub async fn dequeue(&self) -> Option<FrontierEntry> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.cancel.is_cancelled() {
                return None;
            }

            {
                let mut inner = self.lock();
                inner.promote_deferred(self.max_pages, self.capacity);
                if let Some(entry) = inner.pop() {
                    inner.in_flight += 1;
                    drop(inner);
                    self.changed.notify_waiters();
                    return Some(entry);
                }
                if inner.in_flight == 0 {
                    drop(inner);
                    self.changed.notify_waiters();
                    return None;
                }
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = self.cancel.cancelled() => return None,
            }
        }
    }

    /// Marks a dequeued entry as committed
    ///
    /// Call after the links it discovered have been offered.
    pub fn complete(&self) {
        {
            let mut inner = self.lock();
            inner.in_flight = inner.in_flight.saturating_sub(1);
        }
        self.changed.notify_waiters();
    }

    /// Marks a dequeued entry as dropped without producing a page
    ///
    /// Its page budget slot goes to the oldest deferred entry, if any.
    pub fn abandon(&self) {
        {
            let mut inner = self.lock();
            inner.in_flight = inner.in_flight.saturating_sub(1);
            inner.admitted = inner.admitted.saturating_sub(1);
            inner.promote_deferred(self.max_pages, self.capacity);
        }
        self.changed.notify_waiters();
    }

    /// Number of entries waiting to be fetched
    pub fn len(&self) -> usize {
        self.lock().queued
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of dequeued entries not yet completed or abandoned
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Number of URLs counted against the page limit
    pub fn admitted(&self) -> usize {
        self.lock().admitted
    }
}
