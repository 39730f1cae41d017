use crate::state::Page;
use crate::storage::traits::{PageStore, StorageError, StorageResult};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct JobData {
    pages: BTreeMap<u32, Page>,
    blocked: BTreeSet<String>,
}

/// Page store kept in process memory
#[derive(Debug, Default)]
pub struct MemoryPageStore {
    jobs: Mutex<HashMap<String, JobData>>,
}

impl MemoryPageStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn jobs(&self) -> StorageResult<MutexGuard<'_, HashMap<String, JobData>>> {
        self.jobs
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }
}

impl PageStore for MemoryPageStore {
    fn save(&self, job_id: &str, page: &Page) -> StorageResult<()> {
        self.jobs()?
            .entry(job_id.to_string())
            .or_default()
            .pages
            .insert(page.id.0, page.clone());
        Ok(())
    }

    fn save_blocked(&self, job_id: &str, url: &str) -> StorageResult<()> {
        self.jobs()?
            .entry(job_id.to_string())
            .or_default()
            .blocked
            .insert(url.to_string());
        Ok(())
    }

    fn load_all(&self, job_id: &str) -> StorageResult<Vec<Page>> {
        Ok(self
            .jobs()?
            .get(job_id)
            .map(|job| job.pages.values().cloned().collect())
            .unwrap_or_default())
    }

    fn load_blocked(&self, job_id: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .jobs()?
            .get(job_id)
            .map(|job| job.blocked.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn delete_all(&self, job_id: &str) -> StorageResult<()> {
        self.jobs()?.remove(job_id);
        Ok(())
    }

    fn job_ids(&self) -> StorageResult<Vec<String>> {
        let mut ids: Vec<String> = self
            .jobs()?
            .iter()
            .filter(|(_, job)| !job.pages.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{FetchStatus, PageContent, PageId};
    use chrono::Utc;

    fn page(id: u32) -> Page {
        Page {
            id: PageId(id),
            url: format!("https://example.test/{}", id),
            status: FetchStatus::Http(200),
            fetched_at: Utc::now(),
            content_type: None,
            latency_ms: 0,
            redirect_target: None,
            content: PageContent::default(),
            fingerprint: None,
            duplicate_of: None,
        }
    }

    #[test]
    fn test_round_trip_and_delete() {
        let store = MemoryPageStore::new();
        store.save("job", &page(1)).unwrap();
        store.save("job", &page(0)).unwrap();

        let ids: Vec<u32> = store.load_all("job").unwrap().iter().map(|p| p.id.0).collect();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(store.job_ids().unwrap(), vec!["job".to_string()]);

        store.delete_all("job").unwrap();
        assert!(store.load_all("job").unwrap().is_empty());
    }
}
