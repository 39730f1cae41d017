use crate::index::field::Field;
use crate::index::query::{MatchMode, SearchHit, SearchQuery};
use crate::index::tokenizer::{tokenize, Token};
use crate::state::{Page, PageId};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

/// Characters of context kept on each side of a match
const SNIPPET_RADIUS: usize = 40;

/// Occurrences of one token in one field of one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub page: PageId,
    /// Token positions, ascending
    pub positions: Vec<u32>,
}

/// Indexed text of one field, kept for snippets
#[derive(Debug)]
struct FieldDoc {
    text: String,
    spans: Vec<(usize, usize)>,
}

/// Token → field → postings, built incrementally as pages are committed
#[derive(Debug)]
pub struct InvertedIndex {
    fields: Vec<Field>,
    postings: HashMap<String, BTreeMap<Field, Vec<Posting>>>,
    docs: HashMap<(PageId, Field), FieldDoc>,
    urls: HashMap<PageId, String>,
}

impl InvertedIndex {
    /// Creates an empty index covering `fields`
    pub fn new(fields: &[Field]) -> Self {
        Self {
            fields: fields.to_vec(),
            postings: HashMap::new(),
            docs: HashMap::new(),
            urls: HashMap::new(),
        }
    }

    /// Fields this index was built over
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Adds every configured field of `page` to the index
    ///
    /// Duplicate pages are indexed like any other.
    pub fn index(&mut self, page: &Page) {
        self.urls.insert(page.id, page.url.clone());

        for &field in &self.fields {
            let text = field.text_of(page);
            let tokens = tokenize(&text);
            if tokens.is_empty() {
                continue;
            }

            let mut positions: BTreeMap<&str, Vec<u32>> = BTreeMap::new();
            for (pos, token) in tokens.iter().enumerate() {
                positions
                    .entry(token.text.as_str())
                    .or_default()
                    .push(pos as u32);
            }

            for (token, positions) in positions {
                self.postings
                    .entry(token.to_string())
                    .or_default()
                    .entry(field)
                    .or_default()
                    .push(Posting {
                        page: page.id,
                        positions,
                    });
            }

            let spans = tokens.iter().map(|t| (t.start, t.end)).collect();
            self.docs.insert((page.id, field), FieldDoc { text, spans });
        }
    }

    /// Runs a query over the given fields
    ///
    /// Keyword queries match a field containing any query token; phrase
    /// queries match a field containing all tokens contiguously and in order.
    /// Each result is one (page, field) pair. Results are ordered by the
    /// number of fields the page matched (descending), then URL, then field.
    pub fn search(&self, query: &SearchQuery, fields: &[Field]) -> Vec<SearchHit> {
        let tokens: Vec<Token> = tokenize(&query.text);
        if tokens.is_empty() {
            return Vec::new();
        }
        let terms: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();

        let mut matches: BTreeMap<PageId, Vec<(Field, String)>> = BTreeMap::new();
        for &field in fields {
            let found = match query.mode {
                MatchMode::Keyword => self.keyword_matches(&terms, field),
                MatchMode::Phrase => self.phrase_matches(&terms, field),
            };
            for (page, first_pos) in found {
                let span_len = match query.mode {
                    MatchMode::Keyword => 1,
                    MatchMode::Phrase => terms.len(),
                };
                let snippet = self.snippet(page, field, first_pos, span_len);
                matches.entry(page).or_default().push((field, snippet));
            }
        }

        let mut hits: Vec<(usize, SearchHit)> = Vec::new();
        for (page, fields) in matches {
            let matched = fields.len();
            let url = self.urls.get(&page).cloned().unwrap_or_default();
            for (field, snippet) in fields {
                hits.push((
                    matched,
                    SearchHit {
                        page,
                        url: url.clone(),
                        field,
                        snippet,
                    },
                ));
            }
        }

        hits.sort_by(|(ma, a), (mb, b)| {
            (Reverse(*ma), &a.url, a.field).cmp(&(Reverse(*mb), &b.url, b.field))
        });
        hits.into_iter().map(|(_, hit)| hit).collect()
    }

    fn postings(&self, term: &str, field: Field) -> &[Posting] {
        self.postings
            .get(term)
            .and_then(|by_field| by_field.get(&field))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Pages whose field holds any term, with the earliest matching position
    fn keyword_matches(&self, terms: &[&str], field: Field) -> HashMap<PageId, u32> {
        let mut found: HashMap<PageId, u32> = HashMap::new();
        for term in terms {
            for posting in self.postings(term, field) {
                let first = posting.positions.first().copied().unwrap_or(0);
                found
                    .entry(posting.page)
                    .and_modify(|pos| *pos = (*pos).min(first))
                    .or_insert(first);
            }
        }
        found
    }

    /// Pages whose field holds the terms contiguously, with the phrase start position
    fn phrase_matches(&self, terms: &[&str], field: Field) -> HashMap<PageId, u32> {
        let per_term: Vec<HashMap<PageId, &[u32]>> = terms
            .iter()
            .map(|term| {
                self.postings(term, field)
                    .iter()
                    .map(|p| (p.page, p.positions.as_slice()))
                    .collect()
            })
            .collect();

        let mut found = HashMap::new();
        let Some((first, rest)) = per_term.split_first() else {
            return found;
        };

        'pages: for (&page, starts) in first {
            let mut following: Vec<&[u32]> = Vec::with_capacity(rest.len());
            for term_postings in rest {
                match term_postings.get(&page) {
                    Some(positions) => following.push(positions),
                    None => continue 'pages,
                }
            }

            let start = starts.iter().copied().find(|&start| {
                following
                    .iter()
                    .enumerate()
                    .all(|(offset, positions)| {
                        positions.binary_search(&(start + offset as u32 + 1)).is_ok()
                    })
            });
            if let Some(start) = start {
                found.insert(page, start);
            }
        }

        found
    }

    fn snippet(&self, page: PageId, field: Field, position: u32, span_len: usize) -> String {
        let Some(doc) = self.docs.get(&(page, field)) else {
            return String::new();
        };
        let first = position as usize;
        let last = first + span_len.saturating_sub(1);
        let (Some(&(start, _)), Some(&(_, end))) = (doc.spans.get(first), doc.spans.get(last))
        else {
            return String::new();
        };
        make_snippet(&doc.text, start, end)
    }
}

/// Text window around `[start, end)` with whitespace collapsed
fn make_snippet(text: &str, start: usize, end: usize) -> String {
    let from = text[..start]
        .char_indices()
        .rev()
        .take(SNIPPET_RADIUS)
        .last()
        .map_or(start, |(i, _)| i);
    let to = text[end..]
        .char_indices()
        .nth(SNIPPET_RADIUS)
        .map_or(text.len(), |(i, _)| end + i);

    text[from..to].split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{FetchStatus, ImageRef, PageContent};
    use chrono::Utc;

    fn page(id: u32, url: &str, title: &str, body: &str) -> Page {
        Page {
            id: PageId(id),
            url: url.to_string(),
            status: FetchStatus::Http(200),
            fetched_at: Utc::now(),
            content_type: Some("text/html".to_string()),
            latency_ms: 5,
            redirect_target: None,
            content: PageContent {
                title: title.to_string(),
                body_text: body.to_string(),
                ..Default::default()
            },
            fingerprint: None,
            duplicate_of: None,
        }
    }

    fn create_test_index() -> InvertedIndex {
        let mut index = InvertedIndex::new(&Field::ALL);
        index.index(&page(0, "https://example.test/a", "Rust crawler", "a fast web crawler written in rust"));
        index.index(&page(1, "https://example.test/b", "Web pages", "crawler rust fast"));
        index.index(&page(2, "https://example.test/c", "Unrelated", "nothing to see here"));
        index
    }

    fn urls(hits: &[SearchHit]) -> Vec<(&str, Field)> {
        hits.iter().map(|h| (h.url.as_str(), h.field)).collect()
    }

    #[test]
    fn test_keyword_is_any_match() {
        let index = create_test_index();
        let hits = index.search(&SearchQuery::keyword("see rust"), &[Field::Body]);

        assert_eq!(
            urls(&hits),
            vec![
                ("https://example.test/a", Field::Body),
                ("https://example.test/b", Field::Body),
                ("https://example.test/c", Field::Body),
            ]
        );
    }

    #[test]
    fn test_phrase_requires_contiguous_order() {
        let index = create_test_index();
        let hits = index.search(&SearchQuery::phrase("web crawler"), &[Field::Body]);
        assert_eq!(urls(&hits), vec![("https://example.test/a", Field::Body)]);

        let hits = index.search(&SearchQuery::phrase("crawler web"), &[Field::Body]);
        assert!(hits.is_empty());

        let hits = index.search(&SearchQuery::phrase("rust fast"), &[Field::Body]);
        assert_eq!(urls(&hits), vec![("https://example.test/b", Field::Body)]);
    }

    #[test]
    fn test_phrase_results_subset_of_keyword() {
        let index = create_test_index();
        let phrase = index.search(&SearchQuery::phrase("fast web"), &Field::ALL);
        let keyword = index.search(&SearchQuery::keyword("fast web"), &Field::ALL);

        for hit in &phrase {
            assert!(keyword.iter().any(|k| k.page == hit.page && k.field == hit.field));
        }
        assert!(keyword.len() > phrase.len());
    }

    #[test]
    fn test_ordering_by_matched_fields_then_url() {
        let index = create_test_index();
        let hits = index.search(&SearchQuery::keyword("rust"), &[Field::Body, Field::Title]);

        // Page a matches body and title, page b only body
        assert_eq!(
            urls(&hits),
            vec![
                ("https://example.test/a", Field::Body),
                ("https://example.test/a", Field::Title),
                ("https://example.test/b", Field::Body),
            ]
        );
    }

    #[test]
    fn test_unconfigured_field_not_indexed() {
        let mut index = InvertedIndex::new(&[Field::Title]);
        index.index(&page(0, "https://example.test/a", "Title words", "body words"));

        assert!(index.search(&SearchQuery::keyword("body"), &[Field::Body]).is_empty());
        assert_eq!(index.search(&SearchQuery::keyword("title"), &[Field::Title]).len(), 1);
    }

    #[test]
    fn test_alt_text_indexed() {
        let mut index = InvertedIndex::new(&[Field::Alt]);
        let mut p = page(0, "https://example.test/a", "", "");
        p.content.images = vec![
            ImageRef { src: "a.png".to_string(), alt: Some("Company logo".to_string()) },
            ImageRef { src: "b.png".to_string(), alt: None },
        ];
        index.index(&p);

        let hits = index.search(&SearchQuery::phrase("company logo"), &[Field::Alt]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].snippet, "Company logo");
    }

    #[test]
    fn test_snippet_window() {
        let body = format!("{} needle {}", "x".repeat(100), "y".repeat(100));
        let mut index = InvertedIndex::new(&[Field::Body]);
        index.index(&page(0, "https://example.test/a", "", &body));

        let hits = index.search(&SearchQuery::keyword("needle"), &[Field::Body]);
        let snippet = &hits[0].snippet;
        assert!(snippet.contains("needle"));
        assert_eq!(snippet.chars().count(), 40 + "needle".len() + 40);
    }

    #[test]
    fn test_empty_query_matches_nothing() {
        let index = create_test_index();
        assert!(index.search(&SearchQuery::keyword("  !! "), &Field::ALL).is_empty());
    }
}
