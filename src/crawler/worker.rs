//! Fetch worker pool
//!
//! Each worker loops: dequeue → robots check → scheduler acquire → GET →
//! release → extract → send the draft to the committer. Workers exit when
//! the frontier is drained or the crawl is cancelled.

use crate::content::fingerprint;
use crate::crawler::backoff::ExponentialBackoff;
use crate::crawler::committer::{CommitMessage, PageDraft};
use crate::crawler::fetcher::{fetch_url, FetchError, FetchResponse};
use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::crawler::parser::parse_page;
use crate::crawler::scheduler::PoliteScheduler;
use crate::robots::RobotsCache;
use crate::state::FetchStatus;
use crate::url::{host_key, resolve_url};
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Everything a worker needs, shared by the whole pool
pub struct WorkerContext {
    pub frontier: Arc<Frontier>,
    pub scheduler: Arc<PoliteScheduler>,
    pub robots: Arc<RobotsCache>,
    pub client: Client,
    pub backoff: ExponentialBackoff,
    pub max_retries: u32,
    pub cancel: CancellationToken,
    pub paused: watch::Receiver<bool>,
    pub commits: mpsc::UnboundedSender<CommitMessage>,
}

/// Spawns `count` workers sharing `ctx`
pub fn spawn_workers(count: usize, ctx: Arc<WorkerContext>) -> JoinSet<usize> {
    let mut workers = JoinSet::new();
    for id in 0..count {
        let ctx = Arc::clone(&ctx);
        workers.spawn(async move { run_worker(id, ctx).await });
    }
    workers
}

/// Runs one worker until the crawl is drained or cancelled
///
/// # Returns
///
/// The number of entries this worker processed
pub async fn run_worker(id: usize, ctx: Arc<WorkerContext>) -> usize {
    let mut paused = ctx.paused.clone();
    let mut processed = 0;

    loop {
        if !wait_while_paused(&mut paused, &ctx.cancel).await {
            break;
        }
        let Some(entry) = ctx.frontier.dequeue().await else {
            break;
        };
        process_entry(&ctx, entry).await;
        processed += 1;
    }

    tracing::debug!("Worker {} exiting after {} entries", id, processed);
    processed
}

/// Returns false if the crawl was cancelled while paused
async fn wait_while_paused(paused: &mut watch::Receiver<bool>, cancel: &CancellationToken) -> bool {
    tokio::select! {
        resumed = paused.wait_for(|is_paused| !*is_paused) => resumed.is_ok(),
        _ = cancel.cancelled() => false,
    }
}

/// Dequeued entry that has not been handed to the committer yet
///
/// Dropping it without `hand_off` returns the entry's budget slot, including
/// when the worker unwinds from a panic.
struct InFlight<'a> {
    frontier: &'a Frontier,
    handed_off: bool,
}

impl<'a> InFlight<'a> {
    fn new(frontier: &'a Frontier) -> Self {
        Self {
            frontier,
            handed_off: false,
        }
    }

    /// The committer now owns completing the entry
    fn hand_off(mut self) {
        self.handed_off = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.handed_off {
            self.frontier.abandon();
        }
    }
}

async fn process_entry(ctx: &WorkerContext, entry: FrontierEntry) {
    let in_flight = InFlight::new(&ctx.frontier);
    let url = entry.url.clone();

    let allowed = tokio::select! {
        allowed = ctx.robots.allowed(&url) => allowed,
        _ = ctx.cancel.cancelled() => return,
    };

    if !allowed {
        let _ = ctx.commits.send(CommitMessage::Blocked {
            url: url.to_string(),
        });
        return;
    }

    let robots_delay = ctx.robots.crawl_delay(&url).await;

    let draft = match fetch_with_retries(ctx, &url, robots_delay).await {
        Err(FetchError::Cancelled) => return,
        Ok((response, latency)) => build_draft(&url, response, latency),
        Err(e) => {
            tracing::debug!("Fetch failed for {}: {}", url, e);
            PageDraft::failed(&url, e.to_status(), 0)
        }
    };

    if ctx.cancel.is_cancelled() {
        return;
    }

    if ctx
        .commits
        .send(CommitMessage::Fetched { draft, entry })
        .is_ok()
    {
        in_flight.hand_off();
    }
}

/// GETs `url`, retrying transient network errors with exponential backoff
///
/// Scheduler permits are held only around each request.
async fn fetch_with_retries(
    ctx: &WorkerContext,
    url: &Url,
    robots_delay: Option<Duration>,
) -> Result<(FetchResponse, Duration), FetchError> {
    let host = host_key(url);
    let mut attempt = 0;

    loop {
        let Some(token) = ctx.scheduler.acquire(&host, robots_delay, &ctx.cancel).await else {
            return Err(FetchError::Cancelled);
        };

        let started = Instant::now();
        let outcome = tokio::select! {
            result = fetch_url(&ctx.client, url) => result,
            _ = ctx.cancel.cancelled() => Err(FetchError::Cancelled),
        };
        let latency = started.elapsed();
        ctx.scheduler.release(token);

        match outcome {
            Ok(response) => return Ok((response, latency)),
            Err(e) if e.is_transient() && attempt < ctx.max_retries => {
                let delay = ctx.backoff.delay(attempt);
                attempt += 1;
                tracing::warn!(
                    "Transient error for {} ({}), retry {}/{} in {:?}",
                    url,
                    e,
                    attempt,
                    ctx.max_retries,
                    delay
                );
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = ctx.cancel.cancelled() => return Err(FetchError::Cancelled),
                }
            }
            Err(e) => return Err(e),
        }
    }
}

fn build_draft(url: &Url, response: FetchResponse, latency: Duration) -> PageDraft {
    let status = FetchStatus::Http(response.status);
    let redirect_target = response
        .location
        .as_deref()
        .and_then(|location| resolve_url(url, location))
        .map(|target| target.to_string());

    let content = if status.is_success() {
        match parse_page(&response.body, response.content_type.as_deref(), url) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!("Could not parse {}: {}", url, e);
                Default::default()
            }
        }
    } else {
        Default::default()
    };

    let fingerprint = fingerprint(&content.body_text);

    PageDraft {
        url: url.to_string(),
        status,
        content_type: response.content_type,
        latency_ms: latency.as_millis() as u64,
        redirect_target,
        content,
        fingerprint,
    }
}
