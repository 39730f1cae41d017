//! Crawl controller - lifecycle of one crawl run
//!
//! The controller builds every component for a job, seeds the frontier and
//! supervises the worker pool and committer in a background task. It exposes
//! the run's lifecycle (pause, resume, stop, wait) and read-only queries over
//! the results accumulated so far.

use crate::config::{validate_job, CrawlJob, UserAgentConfig};
use crate::crawler::backoff::ExponentialBackoff;
use crate::crawler::committer::{CommitMessage, Committer, StoreWriter};
use crate::crawler::fetcher::build_http_client;
use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::crawler::results::CrawlResults;
use crate::crawler::scheduler::PoliteScheduler;
use crate::crawler::worker::{run_worker, spawn_workers, WorkerContext};
use crate::index::{Field, SearchHit, SearchQuery};
use crate::metrics::MetricsSnapshot;
use crate::output::SiteGraph;
use crate::robots::RobotsCache;
use crate::state::{CrawlProgress, CrawlState, Page};
use crate::storage::PageStore;
use crate::url::DomainScope;
use crate::CrawlError;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Handle to one running or finished crawl
pub struct CrawlController {
    job_id: String,
    job: Arc<CrawlJob>,
    results: Arc<CrawlResults>,
    frontier: Arc<Frontier>,
    cancel: CancellationToken,
    pause_tx: watch::Sender<bool>,
    /// Lifecycle requested by the caller; `Done` is derived from `done_rx`
    requested: Mutex<CrawlState>,
    done_rx: watch::Receiver<bool>,
}

impl CrawlController {
    /// Validates `job` and starts crawling in the background
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `job_id` - Identifier used for logging and persistence
    /// * `job` - The crawl parameters; never mutated after this call
    /// * `user_agent` - User agent sent with every request
    /// * `store` - Optional write-behind page store
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlController)` - The crawl is running
    /// * `Err(CrawlError)` - The job is invalid or the HTTP client could not be built
    pub fn start(
        job_id: impl Into<String>,
        job: CrawlJob,
        user_agent: &UserAgentConfig,
        store: Option<Arc<dyn PageStore>>,
    ) -> Result<Self, CrawlError> {
        let job_id = job_id.into();
        let seed = validate_job(&job)?;
        let job = Arc::new(job);

        let client = build_http_client(user_agent, job.request_timeout())?;
        let cancel = CancellationToken::new();

        let frontier = Arc::new(Frontier::new(
            DomainScope::new(&seed, job.same_domain_only),
            job.max_pages as usize,
            job.frontier_capacity,
            cancel.clone(),
        ));
        let results = Arc::new(CrawlResults::new(&job.search_fields));

        let (pause_tx, pause_rx) = watch::channel(false);
        let (done_tx, done_rx) = watch::channel(false);
        let (commit_tx, commit_rx) = mpsc::unbounded_channel();

        let workers = Arc::new(WorkerContext {
            frontier: Arc::clone(&frontier),
            scheduler: Arc::new(PoliteScheduler::new(
                job.concurrency as usize,
                job.max_per_host as usize,
                job.per_host_delay(),
            )),
            robots: Arc::new(RobotsCache::new(
                client.clone(),
                user_agent.crawler_name.clone(),
            )),
            client,
            backoff: ExponentialBackoff::default(),
            max_retries: job.max_retries,
            cancel: cancel.clone(),
            paused: pause_rx,
            commits: commit_tx,
        });

        let committer = Committer::new(
            Arc::clone(&results),
            Arc::clone(&frontier),
            store.map(|store| StoreWriter::spawn(store, job_id.clone())),
            cancel.clone(),
        );

        tokio::spawn(supervise(
            job_id.clone(),
            seed,
            job.concurrency as usize,
            workers,
            committer,
            commit_rx,
            Arc::clone(&results),
            done_tx,
        ));

        Ok(Self {
            job_id,
            job,
            results,
            frontier,
            cancel,
            pause_tx,
            requested: Mutex::new(CrawlState::Running),
            done_rx,
        })
    }

    fn requested(&self) -> MutexGuard<'_, CrawlState> {
        match self.requested.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn is_finished(&self) -> bool {
        *self.done_rx.borrow()
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn job(&self) -> &CrawlJob {
        &self.job
    }

    /// Current lifecycle state
    pub fn state(&self) -> CrawlState {
        let requested = *self.requested();
        match requested {
            CrawlState::Stopped => CrawlState::Stopped,
            _ if self.is_finished() => CrawlState::Done,
            other => other,
        }
    }

    pub fn progress(&self) -> CrawlProgress {
        CrawlProgress {
            pages_fetched: self.results.page_count(),
            pages_queued: self.frontier.len(),
            state: self.state(),
        }
    }

    /// Holds workers before their next dequeue
    ///
    /// Fetches already in flight complete normally. Returns false if the
    /// crawl was not running.
    pub fn pause(&self) -> bool {
        let mut requested = self.requested();
        if *requested != CrawlState::Running || self.is_finished() {
            return false;
        }
        *requested = CrawlState::Paused;
        self.pause_tx.send_replace(true);
        tracing::info!("Crawl {} paused", self.job_id);
        true
    }

    /// Releases a paused crawl
    pub fn resume(&self) -> bool {
        let mut requested = self.requested();
        if *requested != CrawlState::Paused {
            return false;
        }
        *requested = CrawlState::Running;
        self.pause_tx.send_replace(false);
        tracing::info!("Crawl {} resumed", self.job_id);
        true
    }

    /// Cancels the crawl
    ///
    /// Every waiting worker returns promptly and in-flight pages are
    /// discarded. Stopping a finished crawl has no effect.
    pub fn stop(&self) {
        let mut requested = self.requested();
        if self.is_finished() || *requested == CrawlState::Stopped {
            return;
        }
        *requested = CrawlState::Stopped;
        self.cancel.cancel();
        tracing::info!("Crawl {} stopping", self.job_id);
    }

    /// Waits until all workers and the committer have exited
    pub async fn wait(&self) {
        let mut done = self.done_rx.clone();
        let _ = done.wait_for(|finished| *finished).await;
    }

    /// Pages committed so far, in commit order
    pub fn pages(&self) -> Vec<Arc<Page>> {
        self.results.pages()
    }

    pub fn blocked(&self) -> Vec<String> {
        self.results.blocked()
    }

    /// Fields this crawl indexes
    pub fn indexed_fields(&self) -> Vec<Field> {
        self.results.indexed_fields()
    }

    pub fn search(&self, query: &SearchQuery, fields: &[Field]) -> Vec<SearchHit> {
        self.results.search(query, fields)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.results.metrics()
    }

    pub fn site_graph(&self) -> SiteGraph {
        SiteGraph::build(&self.results.pages())
    }
}

/// Background task owning the worker pool and committer for one crawl
#[allow(clippy::too_many_arguments)]
async fn supervise(
    job_id: String,
    seed: Url,
    concurrency: usize,
    workers: Arc<WorkerContext>,
    committer: Committer,
    commit_rx: mpsc::UnboundedReceiver<CommitMessage>,
    results: Arc<CrawlResults>,
    done_tx: watch::Sender<bool>,
) {
    tracing::info!("Starting crawl {} from {}", job_id, seed);
    let started = Instant::now();

    let committer = tokio::spawn(committer.run(commit_rx));

    workers
        .frontier
        .enqueue(FrontierEntry::seed(seed))
        .await;

    let mut pool = spawn_workers(concurrency, Arc::clone(&workers));
    let mut next_worker = concurrency;
    while let Some(result) = pool.join_next().await {
        if let Err(e) = result {
            tracing::error!("Worker task failed: {}", e);
            // The failed entry was abandoned; keep the pool at full size
            if e.is_panic() && !workers.cancel.is_cancelled() {
                let ctx = Arc::clone(&workers);
                let id = next_worker;
                next_worker += 1;
                pool.spawn(async move { run_worker(id, ctx).await });
            }
        }
    }
    drop(workers);

    // The last commit sender is gone once every worker has exited
    if let Err(e) = committer.await {
        tracing::error!("Committer task failed: {}", e);
    }

    tracing::info!(
        "Crawl {} finished: {} pages in {:.1}s",
        job_id,
        results.page_count(),
        started.elapsed().as_secs_f64()
    );
    done_tx.send_replace(true);
}
