//! Accumulated results of one crawl
//!
//! Written only by the committer; read concurrently by search, metrics and
//! status queries, which see every page committed so far.

use crate::index::{Field, InvertedIndex, SearchHit, SearchQuery};
use crate::metrics::{compute, MetricsSnapshot};
use crate::state::Page;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub struct CrawlResults {
    pages: RwLock<Vec<Arc<Page>>>,
    index: RwLock<InvertedIndex>,
    blocked: RwLock<Vec<String>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl CrawlResults {
    /// Creates empty results indexing `fields`
    pub fn new(fields: &[Field]) -> Self {
        Self {
            pages: RwLock::new(Vec::new()),
            index: RwLock::new(InvertedIndex::new(fields)),
            blocked: RwLock::new(Vec::new()),
        }
    }

    /// Rebuilds results from stored pages
    pub fn from_pages(fields: &[Field], pages: Vec<Page>, blocked: Vec<String>) -> Self {
        let results = Self::new(fields);
        for page in pages {
            results.push(Arc::new(page));
        }
        *write(&results.blocked) = blocked;
        results
    }

    /// Appends a committed page and indexes it
    pub(crate) fn push(&self, page: Arc<Page>) {
        write(&self.index).index(&page);
        write(&self.pages).push(page);
    }

    pub(crate) fn push_blocked(&self, url: String) {
        write(&self.blocked).push(url);
    }

    /// All pages in commit order
    pub fn pages(&self) -> Vec<Arc<Page>> {
        read(&self.pages).clone()
    }

    pub fn page_count(&self) -> usize {
        read(&self.pages).len()
    }

    /// URLs that robots.txt kept from being fetched
    pub fn blocked(&self) -> Vec<String> {
        read(&self.blocked).clone()
    }

    /// Fields present in the index
    pub fn indexed_fields(&self) -> Vec<Field> {
        read(&self.index).fields().to_vec()
    }

    pub fn search(&self, query: &SearchQuery, fields: &[Field]) -> Vec<SearchHit> {
        read(&self.index).search(query, fields)
    }

    /// Recomputes metrics over every page committed so far
    pub fn metrics(&self) -> MetricsSnapshot {
        let pages = self.pages();
        let blocked = self.blocked();
        compute(&pages, &blocked)
    }
}
