//! Inverted index and search over crawled pages
//!
//! The index is built incrementally as pages are committed. Each configured
//! field (body, title, meta description, image alt text) is tokenized into
//! case-folded words with positions, which back both keyword and phrase queries.
//!
//! # Components
//!
//! - `tokenize`: word splitting shared by indexing and queries
//! - `InvertedIndex`: token → field → postings with positions
//! - `SearchQuery`: keyword or quoted phrase query
//! - `SearchHit`: one (page, field, snippet) result

mod field;
mod inverted;
mod query;
mod tokenizer;

pub use field::Field;
pub use inverted::{InvertedIndex, Posting};
pub use query::{MatchMode, SearchHit, SearchQuery};
pub use tokenizer::{tokenize, Token};
