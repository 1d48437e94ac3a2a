//! Cache key definitions.
//!
//! Keys are request-path shaped strings so the same logical resource always
//! lands on the same entry: `/articles` for the collection snapshot and
//! `/articles/{id}` for a single article.

use std::fmt;

use crate::domain::ArticleId;

const COLLECTION_PATH: &str = "/articles";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key of the full-collection snapshot.
    pub fn collection() -> Self {
        Self(COLLECTION_PATH.to_string())
    }

    /// Key of a single article.
    pub fn article(id: &ArticleId) -> Self {
        Self(format!("{COLLECTION_PATH}/{id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
