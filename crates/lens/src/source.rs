//! Source references: deriving a stable source id from a user-supplied
//! reference (share link, watch URL, or bare id).

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::InvalidInputError;

const SHORT_LINK_MARKER: &str = "youtu.be/";
const WATCH_MARKER: &str = "youtube.com/watch?v=";

static RE_SOURCE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap());

/// A parsed reference to one source media item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceRef {
    /// Platform identifier; also the cache key.
    pub source_id: String,
    /// Canonical URL the fetch collaborator should use.
    pub url: String,
}

impl SourceRef {
    /// Parses a share link, a watch URL, or a bare source id.
    pub fn parse(input: &str) -> Result<Self, InvalidInputError> {
        let input = input.trim();

        let candidate = if let Some((_, rest)) = input.split_once(SHORT_LINK_MARKER) {
            rest.split(['?', '&', '#', '/']).next().unwrap_or_default()
        } else if let Some((_, rest)) = input.split_once(WATCH_MARKER) {
            rest.split(['&', '#']).next().unwrap_or_default()
        } else {
            input
        };

        if !RE_SOURCE_ID.is_match(candidate) {
            return Err(InvalidInputError::MalformedSourceRef(input.to_string()));
        }

        Ok(Self::from_valid_id(candidate))
    }

    fn from_valid_id(id: &str) -> Self {
        Self {
            source_id: id.to_string(),
            url: format!("https://www.youtube.com/watch?v={}", id),
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source_id)
    }
}
