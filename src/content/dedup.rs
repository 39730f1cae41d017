use crate::state::PageId;
use std::collections::HashMap;

/// Result of classifying a page's fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// First page seen with this fingerprint
    Original,
    /// Same fingerprint as an earlier committed page
    DuplicateOf(PageId),
}

/// Maps each fingerprint to the first page committed with it
///
/// Owned by the single committer of a crawl, so classification and
/// registration happen in one step and commit order decides which page is
/// the original.
#[derive(Debug, Default)]
pub struct Deduplicator {
    first_seen: HashMap<String, PageId>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies `page` and registers it as the original if the fingerprint is new
    pub fn classify(&mut self, fingerprint: &str, page: PageId) -> Classification {
        match self.first_seen.get(fingerprint) {
            Some(original) => Classification::DuplicateOf(*original),
            None => {
                self.first_seen.insert(fingerprint.to_string(), page);
                Classification::Original
            }
        }
    }

    /// Number of distinct fingerprints seen
    pub(crate) fn distinct(&self) -> usize {
        self.first_seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::fingerprint;

    #[test]
    fn test_first_commit_wins() {
        let mut dedup = Deduplicator::new();
        let fp = fingerprint("hello world").unwrap();

        assert_eq!(dedup.classify(&fp, PageId(0)), Classification::Original);
        assert_eq!(
            dedup.classify(&fp, PageId(1)),
            Classification::DuplicateOf(PageId(0))
        );
        assert_eq!(
            dedup.classify(&fp, PageId(2)),
            Classification::DuplicateOf(PageId(0))
        );
        assert_eq!(dedup.distinct(), 1);
    }

    #[test]
    fn test_distinct_fingerprints_are_originals() {
        let mut dedup = Deduplicator::new();
        let a = fingerprint("page a").unwrap();
        let b = fingerprint("page b").unwrap();

        assert_eq!(dedup.classify(&a, PageId(0)), Classification::Original);
        assert_eq!(dedup.classify(&b, PageId(1)), Classification::Original);
        assert_eq!(dedup.distinct(), 2);
    }
}
