//! Content fingerprinting and exact-duplicate detection
//!
//! Pages are compared by a SHA-256 hash of their cleaned body text. Two pages
//! with the same hash are duplicates regardless of URL; there is no fuzzy or
//! near-duplicate matching.

mod dedup;
mod fingerprint;

pub use dedup::{Classification, Deduplicator};
pub use fingerprint::{clean_text, fingerprint};
