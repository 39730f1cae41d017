//! Crawl service - the operation surface exposed to callers
//!
//! A `CrawlService` owns a registry of crawl jobs. Each job is an explicit,
//! independently running `CrawlController`; nothing is process-global, so
//! any number of crawls can run side by side.

use crate::config::{CrawlJob, UserAgentConfig};
use crate::crawler::{CrawlController, CrawlResults};
use crate::index::{Field, SearchHit, SearchQuery};
use crate::metrics::MetricsSnapshot;
use crate::output::SiteGraph;
use crate::state::{CrawlProgress, Page};
use crate::storage::PageStore;
use crate::SearchError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Identifier of one crawl job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| SearchError::InvalidArgument(format!("not a job id: {}", s)))
    }
}

/// Registry and entry point for crawl jobs
pub struct CrawlService {
    user_agent: UserAgentConfig,
    store: Option<Arc<dyn PageStore>>,
    jobs: RwLock<HashMap<JobId, Arc<CrawlController>>>,
}

impl CrawlService {
    /// Creates a service
    ///
    /// # Arguments
    ///
    /// * `user_agent` - User agent used by every crawl
    /// * `store` - Optional write-behind store shared by all jobs
    pub fn new(user_agent: UserAgentConfig, store: Option<Arc<dyn PageStore>>) -> Self {
        Self {
            user_agent,
            store,
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Starts an asynchronous crawl and returns immediately
    ///
    /// Configuration errors (invalid start URL, zero concurrency, ...) are
    /// reported here and no job is created. Must be called from within a
    /// Tokio runtime.
    pub fn start_crawl(&self, job: CrawlJob) -> crate::Result<JobId> {
        let id = JobId::new();
        let controller =
            CrawlController::start(id.to_string(), job, &self.user_agent, self.store.clone())?;

        let mut jobs = match self.jobs.write() {
            Ok(jobs) => jobs,
            Err(poisoned) => poisoned.into_inner(),
        };
        jobs.insert(id, Arc::new(controller));
        Ok(id)
    }

    fn controller(&self, id: JobId) -> Result<Arc<CrawlController>, SearchError> {
        let jobs = match self.jobs.read() {
            Ok(jobs) => jobs,
            Err(poisoned) => poisoned.into_inner(),
        };
        jobs.get(&id)
            .cloned()
            .ok_or_else(|| SearchError::UnknownJob(id.to_string()))
    }

    /// Ids of every job started by this service
    pub fn jobs(&self) -> Vec<JobId> {
        let jobs = match self.jobs.read() {
            Ok(jobs) => jobs,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut ids: Vec<JobId> = jobs.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn crawl_status(&self, id: JobId) -> Result<CrawlProgress, SearchError> {
        Ok(self.controller(id)?.progress())
    }

    pub fn stop_crawl(&self, id: JobId) -> Result<(), SearchError> {
        self.controller(id)?.stop();
        Ok(())
    }

    /// Returns false if the crawl was not running
    pub fn pause_crawl(&self, id: JobId) -> Result<bool, SearchError> {
        Ok(self.controller(id)?.pause())
    }

    /// Returns false if the crawl was not paused
    pub fn resume_crawl(&self, id: JobId) -> Result<bool, SearchError> {
        Ok(self.controller(id)?.resume())
    }

    /// Waits for a crawl to finish or stop, then reports its final status
    pub async fn wait(&self, id: JobId) -> Result<CrawlProgress, SearchError> {
        let controller = self.controller(id)?;
        controller.wait().await;
        Ok(controller.progress())
    }

    /// Searches the pages a crawl has indexed so far
    ///
    /// # Arguments
    ///
    /// * `id` - The crawl to search
    /// * `query` - Keywords, or a phrase wrapped in double quotes
    /// * `fields` - Field names to search; empty means every indexed field
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<SearchHit>)` - Hits ordered by matched-field count, then URL
    /// * `Err(SearchError)` - Unknown job, unknown or unindexed field, or empty query
    pub fn search<S: AsRef<str>>(
        &self,
        id: JobId,
        query: &str,
        fields: &[S],
    ) -> Result<Vec<SearchHit>, SearchError> {
        let controller = self.controller(id)?;
        let (query, fields) = prepare_search(query, fields, &controller.indexed_fields())?;
        Ok(controller.search(&query, &fields))
    }

    /// Pages committed so far, in commit order
    pub fn pages(&self, id: JobId) -> Result<Vec<Arc<Page>>, SearchError> {
        Ok(self.controller(id)?.pages())
    }

    pub fn metrics(&self, id: JobId) -> Result<MetricsSnapshot, SearchError> {
        Ok(self.controller(id)?.metrics())
    }

    pub fn site_graph(&self, id: JobId) -> Result<SiteGraph, SearchError> {
        Ok(self.controller(id)?.site_graph())
    }

    /// Rebuilds the results of a previous crawl from the page store
    ///
    /// Every field is indexed, whatever the original job selected.
    pub fn load_stored(&self, job_id: &str) -> crate::Result<CrawlResults> {
        let store = self.store.as_ref().ok_or_else(|| {
            SearchError::InvalidArgument("no page store configured".to_string())
        })?;

        let pages = store.load_all(job_id)?;
        if pages.is_empty() {
            return Err(SearchError::UnknownJob(job_id.to_string()).into());
        }
        let blocked = store.load_blocked(job_id)?;

        Ok(CrawlResults::from_pages(&Field::ALL, pages, blocked))
    }

    /// Stops a crawl, forgets it and deletes its stored pages
    pub async fn delete_job(&self, id: JobId) -> crate::Result<()> {
        let removed = {
            let mut jobs = match self.jobs.write() {
                Ok(jobs) => jobs,
                Err(poisoned) => poisoned.into_inner(),
            };
            jobs.remove(&id)
        };
        let controller = removed.ok_or_else(|| SearchError::UnknownJob(id.to_string()))?;
        controller.stop();
        controller.wait().await;

        if let Some(store) = &self.store {
            store.delete_all(&id.to_string())?;
        }
        Ok(())
    }
}

/// Validates a raw query and field list against the fields a crawl indexed
pub fn prepare_search<S: AsRef<str>>(
    query: &str,
    fields: &[S],
    indexed: &[Field],
) -> Result<(SearchQuery, Vec<Field>), SearchError> {
    let parsed = SearchQuery::parse(query);
    if parsed.text.trim().is_empty() {
        return Err(SearchError::InvalidArgument("empty search query".to_string()));
    }

    let fields = if fields.is_empty() {
        indexed.to_vec()
    } else {
        Field::parse_list(fields)?
    };

    if let Some(missing) = fields.iter().find(|f| !indexed.contains(f)) {
        return Err(SearchError::InvalidArgument(format!(
            "field '{}' is not indexed for this crawl",
            missing
        )));
    }

    Ok((parsed, fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MatchMode;
    use crate::storage::MemoryPageStore;
    use crate::{ConfigError, CrawlError};

    fn unreachable_job() -> CrawlJob {
        let mut job = CrawlJob::new("http://127.0.0.1:9/");
        job.max_retries = 0;
        job.per_host_delay = 0.0;
        job
    }

    #[test]
    fn test_job_id_round_trip() {
        let id = JobId::new();
        let parsed: JobId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!(matches!(
            "nope".parse::<JobId>(),
            Err(SearchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_prepare_search() {
        let indexed = [Field::Title, Field::Body];

        let (query, fields) = prepare_search("\"hello world\"", &["title"], &indexed).unwrap();
        assert_eq!(query.mode, MatchMode::Phrase);
        assert_eq!(fields, vec![Field::Title]);

        let (_, fields) = prepare_search::<&str>("hello", &[], &indexed).unwrap();
        assert_eq!(fields, indexed.to_vec());

        assert_eq!(
            prepare_search("hello", &["colour"], &indexed).unwrap_err(),
            SearchError::UnknownField("colour".to_string())
        );
        assert!(matches!(
            prepare_search("hello", &["alt"], &indexed),
            Err(SearchError::InvalidArgument(_))
        ));
        assert!(matches!(
            prepare_search::<&str>("   ", &[], &indexed),
            Err(SearchError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let service = CrawlService::new(UserAgentConfig::default(), None);
        let id = JobId::new();

        assert_eq!(
            service.crawl_status(id).unwrap_err(),
            SearchError::UnknownJob(id.to_string())
        );
        assert!(matches!(
            service.search(id, "x", &["body"]),
            Err(SearchError::UnknownJob(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_job_rejected_synchronously() {
        let service = CrawlService::new(UserAgentConfig::default(), None);

        let mut job = unreachable_job();
        job.concurrency = 0;
        assert!(matches!(
            service.start_crawl(job),
            Err(CrawlError::Config(ConfigError::Validation(_)))
        ));

        let mut huge_delay = unreachable_job();
        huge_delay.per_host_delay = 1e30;
        assert!(matches!(
            service.start_crawl(huge_delay),
            Err(CrawlError::Config(ConfigError::Validation(_)))
        ));

        let bad_url = CrawlJob::new("ftp://example.test/");
        assert!(matches!(
            service.start_crawl(bad_url),
            Err(CrawlError::Config(ConfigError::InvalidUrl(_)))
        ));
        assert!(service.jobs().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_seed_records_failed_page() {
        let store = Arc::new(MemoryPageStore::new());
        let service = CrawlService::new(UserAgentConfig::default(), Some(store.clone()));

        let id = service.start_crawl(unreachable_job()).unwrap();
        let progress = service.wait(id).await.unwrap();

        assert_eq!(progress.pages_fetched, 1);
        assert!(progress.state.is_finished());

        let metrics = service.metrics(id).unwrap();
        assert_eq!(metrics.network_failures.urls, vec!["http://127.0.0.1:9/"]);

        let stored = service.load_stored(&id.to_string()).unwrap();
        assert_eq!(stored.page_count(), 1);

        service.delete_job(id).await.unwrap();
        assert!(store.load_all(&id.to_string()).unwrap().is_empty());
        assert!(service.crawl_status(id).is_err());
    }
}
