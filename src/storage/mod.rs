//! Storage module for persisting crawl results
//!
//! The crawl treats storage as a write-behind cache: pages are saved after
//! they are committed in memory, and crawl or search correctness never
//! depends on the store being reachable.
//!
//! - `PageStore`: the interface the crawl controller is given
//! - `SqlitePageStore`: SQLite backend keyed by job id
//! - `MemoryPageStore`: in-process backend for tests and store-less runs

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryPageStore;
pub use sqlite::SqlitePageStore;
pub use traits::{PageStore, StorageError, StorageResult};

use std::path::Path;

/// Opens (or creates) a SQLite page store
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqlitePageStore)` - Successfully opened store
/// * `Err(StorageError)` - Failed to open the database or create the schema
pub fn open_storage(path: &Path) -> StorageResult<SqlitePageStore> {
    SqlitePageStore::new(path)
}
