use crate::state::Page;
use crate::SearchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A page field that can be indexed and searched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    #[serde(alias = "text")]
    Body,
    Title,
    #[serde(alias = "description")]
    Meta,
    Alt,
}

impl Field {
    /// Every searchable field, in result tie-break order
    pub const ALL: [Field; 4] = [Field::Body, Field::Title, Field::Meta, Field::Alt];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Body => "body",
            Self::Title => "title",
            Self::Meta => "meta",
            Self::Alt => "alt",
        }
    }

    /// Text of this field on `page`
    ///
    /// Alt texts of all images are joined with a space; missing alts contribute nothing.
    pub fn text_of(&self, page: &Page) -> String {
        let content = &page.content;
        match self {
            Self::Body => content.body_text.clone(),
            Self::Title => content.title.clone(),
            Self::Meta => content.meta_description.clone(),
            Self::Alt => content
                .images
                .iter()
                .filter_map(|img| img.alt.as_deref())
                .map(str::trim)
                .filter(|alt| !alt.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// Parses a list of field names, rejecting the first unknown one
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Result<Vec<Field>, SearchError> {
        let mut fields = Vec::new();
        for name in names {
            let field: Field = name.as_ref().parse()?;
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
        Ok(fields)
    }
}

impl FromStr for Field {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "body" | "text" => Ok(Self::Body),
            "title" => Ok(Self::Title),
            "meta" | "description" => Ok(Self::Meta),
            "alt" | "alt-text" | "alt_text" => Ok(Self::Alt),
            _ => Err(SearchError::UnknownField(s.to_string())),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
