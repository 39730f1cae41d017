//! Storage traits and error types

use crate::state::Page;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage lock poisoned: {0}")]
    Lock(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistent store of crawl results, keyed by job id
///
/// Implementations are shared between the crawl's writer thread and readers,
/// so every method takes `&self`.
pub trait PageStore: Send + Sync {
    /// Saves one committed page, replacing any page with the same id
    fn save(&self, job_id: &str, page: &Page) -> StorageResult<()>;

    /// Records a URL that robots.txt kept the crawler from fetching
    fn save_blocked(&self, job_id: &str, url: &str) -> StorageResult<()>;

    /// Loads every page of a job in commit order
    fn load_all(&self, job_id: &str) -> StorageResult<Vec<Page>>;

    /// Loads the robots-blocked URLs of a job
    fn load_blocked(&self, job_id: &str) -> StorageResult<Vec<String>>;

    /// Removes everything stored for a job
    fn delete_all(&self, job_id: &str) -> StorageResult<()>;

    /// Ids of every job with stored pages
    fn job_ids(&self) -> StorageResult<Vec<String>>;
}
