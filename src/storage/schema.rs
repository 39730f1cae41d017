//! Database schema definitions

/// SQL schema for the page store
pub const SCHEMA_SQL: &str = r#"
-- One row per committed page; the page itself is stored as JSON
CREATE TABLE IF NOT EXISTS pages (
    job_id TEXT NOT NULL,
    page_id INTEGER NOT NULL,
    url TEXT NOT NULL,
    status TEXT NOT NULL,
    fetched_at TEXT NOT NULL,
    data TEXT NOT NULL,
    PRIMARY KEY (job_id, page_id)
);

CREATE INDEX IF NOT EXISTS idx_pages_job_url ON pages(job_id, url);

-- URLs disallowed by robots.txt
CREATE TABLE IF NOT EXISTS blocked_urls (
    job_id TEXT NOT NULL,
    url TEXT NOT NULL,
    PRIMARY KEY (job_id, url)
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize_schema(&conn).unwrap();
        let result = initialize_schema(&conn);

        assert!(result.is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        for table in ["pages", "blocked_urls"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }
}
