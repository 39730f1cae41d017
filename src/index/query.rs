use crate::index::field::Field;
use crate::state::PageId;
use serde::Serialize;

/// How query tokens must appear in a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Any query token present
    Keyword,
    /// All query tokens present, contiguous and in order
    Phrase,
}

/// A parsed search query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub mode: MatchMode,
}

impl SearchQuery {
    pub fn keyword(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: MatchMode::Keyword,
        }
    }

    pub fn phrase(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: MatchMode::Phrase,
        }
    }

    /// Parses raw user input; text wrapped in double quotes is a phrase query
    ///
    /// ```
    /// use crawlscope::index::{MatchMode, SearchQuery};
    ///
    /// assert_eq!(SearchQuery::parse("\"hello world\"").mode, MatchMode::Phrase);
    /// assert_eq!(SearchQuery::parse("hello world").mode, MatchMode::Keyword);
    /// ```
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
        {
            Some(inner) => Self::phrase(inner),
            None => Self::keyword(trimmed),
        }
    }
}

/// One search result: a page, the field that matched, and surrounding text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub page: PageId,
    pub url: String,
    pub field: Field,
    pub snippet: String,
}
