//! SQLite storage implementation

use crate::state::Page;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{PageStore, StorageError, StorageResult};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite page store
pub struct SqlitePageStore {
    conn: Mutex<Connection>,
}

impl SqlitePageStore {
    /// Opens or creates the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqlitePageStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }
}

impl PageStore for SqlitePageStore {
    fn save(&self, job_id: &str, page: &Page) -> StorageResult<()> {
        let data = serde_json::to_string(page)?;
        self.conn()?.execute(
            "INSERT OR REPLACE INTO pages (job_id, page_id, url, status, fetched_at, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                job_id,
                page.id.0,
                page.url,
                page.status.to_string(),
                page.fetched_at.to_rfc3339(),
                data
            ],
        )?;
        Ok(())
    }

    fn save_blocked(&self, job_id: &str, url: &str) -> StorageResult<()> {
        self.conn()?.execute(
            "INSERT OR IGNORE INTO blocked_urls (job_id, url) VALUES (?1, ?2)",
            params![job_id, url],
        )?;
        Ok(())
    }

    fn load_all(&self, job_id: &str) -> StorageResult<Vec<Page>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT data FROM pages WHERE job_id = ?1 ORDER BY page_id ASC")?;

        let rows = stmt.query_map([job_id], |row| row.get::<_, String>(0))?;

        let mut pages = Vec::new();
        for row in rows {
            pages.push(serde_json::from_str(&row?)?);
        }
        Ok(pages)
    }

    fn load_blocked(&self, job_id: &str) -> StorageResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT url FROM blocked_urls WHERE job_id = ?1 ORDER BY url ASC")?;

        let urls = stmt
            .query_map([job_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(urls)
    }

    fn delete_all(&self, job_id: &str) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM pages WHERE job_id = ?1", [job_id])?;
        tx.execute("DELETE FROM blocked_urls WHERE job_id = ?1", [job_id])?;
        tx.commit()?;
        Ok(())
    }

    fn job_ids(&self) -> StorageResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT DISTINCT job_id FROM pages ORDER BY job_id")?;

        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{FetchStatus, PageContent, PageId};
    use chrono::Utc;
    use tempfile::TempDir;

    fn create_test_page(id: u32, path: &str) -> Page {
        Page {
            id: PageId(id),
            url: format!("https://example.test{}", path),
            status: FetchStatus::Http(200),
            fetched_at: Utc::now(),
            content_type: Some("text/html".to_string()),
            latency_ms: 20,
            redirect_target: None,
            content: PageContent {
                title: "Example".to_string(),
                body_text: "hello world".to_string(),
                outlinks: vec!["https://example.test/about".to_string()],
                ..Default::default()
            },
            fingerprint: Some("abc".to_string()),
            duplicate_of: None,
        }
    }

    #[test]
    fn test_create_in_memory() {
        assert!(SqlitePageStore::new_in_memory().is_ok());
    }

    #[test]
    fn test_save_and_load_in_commit_order() {
        let store = SqlitePageStore::new_in_memory().unwrap();
        let second = create_test_page(1, "/about");
        let first = create_test_page(0, "/");

        store.save("job-1", &second).unwrap();
        store.save("job-1", &first).unwrap();

        let pages = store.load_all("job-1").unwrap();
        assert_eq!(pages, vec![first, second]);
        assert!(store.load_all("job-2").unwrap().is_empty());
    }

    #[test]
    fn test_save_replaces_same_id() {
        let store = SqlitePageStore::new_in_memory().unwrap();
        let mut page = create_test_page(0, "/");
        store.save("job", &page).unwrap();

        page.status = FetchStatus::Http(500);
        store.save("job", &page).unwrap();

        let pages = store.load_all("job").unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].status, FetchStatus::Http(500));
    }

    #[test]
    fn test_delete_all_only_touches_one_job() {
        let store = SqlitePageStore::new_in_memory().unwrap();
        store.save("a", &create_test_page(0, "/")).unwrap();
        store.save("b", &create_test_page(0, "/")).unwrap();
        store.save_blocked("a", "https://example.test/private/x").unwrap();

        store.delete_all("a").unwrap();

        assert!(store.load_all("a").unwrap().is_empty());
        assert!(store.load_blocked("a").unwrap().is_empty());
        assert_eq!(store.load_all("b").unwrap().len(), 1);
        assert_eq!(store.job_ids().unwrap(), vec!["b".to_string()]);
    }

    #[test]
    fn test_blocked_urls_deduplicated() {
        let store = SqlitePageStore::new_in_memory().unwrap();
        store.save_blocked("job", "https://example.test/private/x").unwrap();
        store.save_blocked("job", "https://example.test/private/x").unwrap();

        assert_eq!(store.load_blocked("job").unwrap().len(), 1);
    }

    #[test]
    fn test_file_database_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crawl.db");

        {
            let store = SqlitePageStore::new(&path).unwrap();
            store.save("job", &create_test_page(0, "/")).unwrap();
        }

        let store = SqlitePageStore::new(&path).unwrap();
        assert_eq!(store.load_all("job").unwrap().len(), 1);
    }
}
