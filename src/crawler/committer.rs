//! Single writer for crawl results
//!
//! Fetch workers never touch the page list, the fingerprint map or the index
//! directly. They send drafts over a channel, and one committer task assigns
//! page ids and timestamps, classifies duplicates, indexes the page and
//! offers its links back to the frontier. Commit order therefore decides
//! which of two identical pages is the original.

use crate::content::{Classification, Deduplicator};
use crate::crawler::frontier::{EnqueueOutcome, Frontier, FrontierEntry};
use crate::crawler::results::CrawlResults;
use crate::state::{FetchStatus, Page, PageContent, PageId};
use crate::storage::PageStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Fetch outcome produced by a worker, before it becomes a [`Page`]
#[derive(Debug, Clone)]
pub struct PageDraft {
    pub url: String,
    pub status: FetchStatus,
    pub content_type: Option<String>,
    pub latency_ms: u64,
    pub redirect_target: Option<String>,
    pub content: PageContent,
    pub fingerprint: Option<String>,
}

impl PageDraft {
    /// Draft for a fetch that produced no body
    pub fn failed(url: &Url, status: FetchStatus, latency_ms: u64) -> Self {
        Self {
            url: url.to_string(),
            status,
            content_type: None,
            latency_ms,
            redirect_target: None,
            content: PageContent::default(),
            fingerprint: None,
        }
    }
}

/// Messages from fetch workers to the committer
#[derive(Debug)]
pub enum CommitMessage {
    Fetched {
        draft: PageDraft,
        entry: FrontierEntry,
    },
    Blocked {
        url: String,
    },
}

/// Messages to the write-behind store task
#[derive(Debug)]
enum StoreMessage {
    Page(Arc<Page>),
    Blocked(String),
}

/// Forwards committed results to a [`PageStore`] off the async runtime
pub struct StoreWriter {
    tx: mpsc::UnboundedSender<StoreMessage>,
    handle: JoinHandle<()>,
}

impl StoreWriter {
    /// Spawns the blocking writer task for one job
    pub fn spawn(store: Arc<dyn PageStore>, job_id: String) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<StoreMessage>();

        let handle = tokio::task::spawn_blocking(move || {
            let mut written = 0usize;
            while let Some(message) = rx.blocking_recv() {
                let result = match &message {
                    StoreMessage::Page(page) => store.save(&job_id, page),
                    StoreMessage::Blocked(url) => store.save_blocked(&job_id, url),
                };
                match result {
                    Ok(()) => written += 1,
                    Err(e) => tracing::warn!("Failed to persist result for job {}: {}", job_id, e),
                }
            }
            tracing::debug!("Store writer for job {} finished ({} records)", job_id, written);
        });

        Self { tx, handle }
    }

    fn send(&self, message: StoreMessage) {
        if self.tx.send(message).is_err() {
            tracing::warn!("Store writer stopped; result not persisted");
        }
    }

    /// Closes the channel and waits for pending writes
    pub async fn finish(self) {
        drop(self.tx);
        if let Err(e) = self.handle.await {
            tracing::warn!("Store writer task failed: {}", e);
        }
    }
}

/// Owns every mutation of a crawl's shared results
pub struct Committer {
    results: Arc<CrawlResults>,
    frontier: Arc<Frontier>,
    dedup: Deduplicator,
    store: Option<StoreWriter>,
    cancel: CancellationToken,
    next_id: u32,
    last_fetched_at: Option<DateTime<Utc>>,
}

impl Committer {
    pub fn new(
        results: Arc<CrawlResults>,
        frontier: Arc<Frontier>,
        store: Option<StoreWriter>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            results,
            frontier,
            dedup: Deduplicator::new(),
            store,
            cancel,
            next_id: 0,
            last_fetched_at: None,
        }
    }

    /// Processes messages until every worker has dropped its sender
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<CommitMessage>) {
        while let Some(message) = rx.recv().await {
            match message {
                CommitMessage::Fetched { draft, entry } => {
                    if self.cancel.is_cancelled() {
                        tracing::debug!("Discarding {} fetched after stop", draft.url);
                        self.frontier.abandon();
                        continue;
                    }
                    let page = self.commit(draft);
                    self.offer_links(&page, &entry).await;
                    self.frontier.complete();
                }
                CommitMessage::Blocked { url } => {
                    tracing::debug!("Blocked by robots.txt: {}", url);
                    if let Some(store) = &self.store {
                        store.send(StoreMessage::Blocked(url.clone()));
                    }
                    self.results.push_blocked(url);
                }
            }
        }

        tracing::debug!(
            "Committer finished: {} pages, {} distinct fingerprints",
            self.next_id,
            self.dedup.distinct()
        );

        if let Some(store) = self.store.take() {
            store.finish().await;
        }
    }

    /// Turns a draft into an immutable page and publishes it
    fn commit(&mut self, draft: PageDraft) -> Arc<Page> {
        let id = PageId(self.next_id);
        self.next_id += 1;

        let duplicate_of = draft
            .fingerprint
            .as_deref()
            .and_then(|fp| match self.dedup.classify(fp, id) {
                Classification::Original => None,
                Classification::DuplicateOf(original) => Some(original),
            });

        let page = Arc::new(Page {
            id,
            url: draft.url,
            status: draft.status,
            fetched_at: self.next_timestamp(),
            content_type: draft.content_type,
            latency_ms: draft.latency_ms,
            redirect_target: draft.redirect_target,
            content: draft.content,
            fingerprint: draft.fingerprint,
            duplicate_of,
        });

        match page.duplicate_of {
            Some(original) => tracing::info!(
                "Committed {} {} [{}] (duplicate of {})",
                page.id,
                page.url,
                page.status,
                original
            ),
            None => tracing::info!("Committed {} {} [{}]", page.id, page.url, page.status),
        }

        self.results.push(Arc::clone(&page));
        if let Some(store) = &self.store {
            store.send(StoreMessage::Page(Arc::clone(&page)));
        }
        page
    }

    /// Commit timestamps are strictly increasing
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_fetched_at {
            if now <= last {
                now = last + chrono::Duration::microseconds(1);
            }
        }
        self.last_fetched_at = Some(now);
        now
    }

    async fn offer_links(&self, page: &Page, entry: &FrontierEntry) {
        let targets = page
            .content
            .outlinks
            .iter()
            .chain(page.redirect_target.iter());

        for target in targets {
            let Ok(url) = Url::parse(target) else {
                continue;
            };
            let outcome = self
                .frontier
                .enqueue(FrontierEntry::discovered(url, entry))
                .await;
            if outcome == EnqueueOutcome::Cancelled {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::fingerprint;
    use crate::index::{Field, SearchQuery};
    use crate::storage::MemoryPageStore;
    use crate::url::DomainScope;

    fn setup(cancel: &CancellationToken) -> (Arc<CrawlResults>, Arc<Frontier>) {
        let seed = Url::parse("https://example.test/").unwrap();
        let frontier = Arc::new(Frontier::new(
            DomainScope::new(&seed, true),
            10,
            10,
            cancel.clone(),
        ));
        (Arc::new(CrawlResults::new(&Field::ALL)), frontier)
    }

    fn draft(url: &str, body: &str, outlinks: &[&str]) -> PageDraft {
        PageDraft {
            url: url.to_string(),
            status: FetchStatus::Http(200),
            content_type: Some("text/html".to_string()),
            latency_ms: 5,
            redirect_target: None,
            content: PageContent {
                body_text: body.to_string(),
                outlinks: outlinks.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
            fingerprint: fingerprint(body),
        }
    }

    async fn fetched(frontier: &Frontier, url: &str) -> FrontierEntry {
        frontier
            .enqueue(FrontierEntry::seed(Url::parse(url).unwrap()))
            .await;
        frontier.dequeue().await.unwrap()
    }

    #[tokio::test]
    async fn test_commit_assigns_ids_and_dedups() {
        let cancel = CancellationToken::new();
        let (results, frontier) = setup(&cancel);
        let store = Arc::new(MemoryPageStore::new());
        let writer = StoreWriter::spawn(store.clone(), "job".to_string());
        let committer = Committer::new(
            Arc::clone(&results),
            Arc::clone(&frontier),
            Some(writer),
            cancel.clone(),
        );

        let (tx, rx) = mpsc::unbounded_channel();
        let a = fetched(&frontier, "https://example.test/a").await;
        let b = fetched(&frontier, "https://example.test/b").await;
        tx.send(CommitMessage::Fetched {
            draft: draft("https://example.test/a", "Hello  World", &[]),
            entry: a,
        })
        .unwrap();
        tx.send(CommitMessage::Fetched {
            draft: draft("https://example.test/b", "hello world", &[]),
            entry: b,
        })
        .unwrap();
        tx.send(CommitMessage::Blocked {
            url: "https://example.test/private/x".to_string(),
        })
        .unwrap();
        drop(tx);

        committer.run(rx).await;

        let pages = results.pages();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].id, PageId(0));
        assert!(pages[0].duplicate_of.is_none());
        assert_eq!(pages[1].duplicate_of, Some(PageId(0)));
        assert!(pages[0].fetched_at < pages[1].fetched_at);
        assert_eq!(results.blocked(), vec!["https://example.test/private/x"]);
        assert_eq!(frontier.in_flight(), 0);

        // Write-behind store has everything once the committer returns
        assert_eq!(store.load_all("job").unwrap().len(), 2);
        assert_eq!(store.load_blocked("job").unwrap().len(), 1);

        let hits = results.search(&SearchQuery::keyword("hello"), &[Field::Body]);
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_outlinks_offered_to_frontier() {
        let cancel = CancellationToken::new();
        let (results, frontier) = setup(&cancel);
        let committer = Committer::new(
            Arc::clone(&results),
            Arc::clone(&frontier),
            None,
            cancel.clone(),
        );

        let (tx, rx) = mpsc::unbounded_channel();
        let root = fetched(&frontier, "https://example.test/").await;
        tx.send(CommitMessage::Fetched {
            draft: draft(
                "https://example.test/",
                "home",
                &[
                    "https://example.test/about",
                    "https://other.test/",
                    "https://example.test/",
                ],
            ),
            entry: root,
        })
        .unwrap();
        drop(tx);

        committer.run(rx).await;

        assert_eq!(frontier.len(), 1);
        let next = frontier.dequeue().await.unwrap();
        assert_eq!(next.url.as_str(), "https://example.test/about");
        assert_eq!(next.depth, 1);
    }

    #[tokio::test]
    async fn test_drafts_discarded_after_cancel() {
        let cancel = CancellationToken::new();
        let (results, frontier) = setup(&cancel);
        let committer = Committer::new(
            Arc::clone(&results),
            Arc::clone(&frontier),
            None,
            cancel.clone(),
        );

        let (tx, rx) = mpsc::unbounded_channel();
        let entry = fetched(&frontier, "https://example.test/").await;
        cancel.cancel();
        tx.send(CommitMessage::Fetched {
            draft: draft("https://example.test/", "late", &[]),
            entry,
        })
        .unwrap();
        drop(tx);

        committer.run(rx).await;

        assert_eq!(results.page_count(), 0);
        assert_eq!(frontier.in_flight(), 0);
    }
}
