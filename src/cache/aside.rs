//! Cache-aside accessor over a [`KvStore`].
//!
//! `read` never turns a missing or corrupt entry into an error: both are
//! reported as [`Lookup::Absent`] so callers can fall through to the origin.
//! Store transport failures are surfaced and left to the caller's policy.

use std::sync::Arc;

use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::codec::{self, CodecError};
use super::keys::CacheKey;
use super::store::{KvStore, StoreError};

const SOURCE: &str = "cache::aside";

const METRIC_HIT: &str = "kvedge_cache_hit_total";
const METRIC_MISS: &str = "kvedge_cache_miss_total";
const METRIC_DECODE_ERROR: &str = "kvedge_cache_decode_error_total";
const METRIC_WRITE: &str = "kvedge_cache_write_total";
const METRIC_DELETE: &str = "kvedge_cache_delete_total";

/// Outcome of a cache read.
///
/// An entry that is present but holds an empty value (`null`, `[]`) is still a
/// `Hit`; only a missing or undecodable entry is `Absent`.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Hit(T),
    Absent,
}

impl<T> Lookup<T> {
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Hit(value) => Some(value),
            Lookup::Absent => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

#[derive(Clone)]
pub struct CacheAside {
    store: Arc<dyn KvStore>,
}

impl CacheAside {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    #[instrument(skip_all, fields(key = %key))]
    pub async fn read<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Lookup<T>, CacheError> {
        let Some(text) = self.store.get(key).await? else {
            counter!(METRIC_MISS).increment(1);
            debug!(source = SOURCE, outcome = "miss", "cache lookup");
            return Ok(Lookup::Absent);
        };

        match codec::decode(&text) {
            Ok(value) => {
                counter!(METRIC_HIT).increment(1);
                debug!(source = SOURCE, outcome = "hit", "cache lookup");
                Ok(Lookup::Hit(value))
            }
            Err(err) => {
                counter!(METRIC_DECODE_ERROR).increment(1);
                counter!(METRIC_MISS).increment(1);
                warn!(
                    source = SOURCE,
                    outcome = "corrupt",
                    error = %err,
                    "bypassing undecodable cache entry"
                );
                Ok(Lookup::Absent)
            }
        }
    }

    /// Encode `value` and store it at `key`, replacing any existing entry.
    #[instrument(skip_all, fields(key = %key))]
    pub async fn write<T>(&self, key: &CacheKey, value: &T) -> Result<(), CacheError>
    where
        T: Serialize + ?Sized + Sync,
    {
        let text = codec::encode(value)?;
        self.store.put(key, text).await?;
        counter!(METRIC_WRITE).increment(1);
        debug!(source = SOURCE, "cache entry written");
        Ok(())
    }

    /// Remove any entry at `key`. Absent keys are not an error.
    #[instrument(skip_all, fields(key = %key))]
    pub async fn delete(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.store.delete(key).await?;
        counter!(METRIC_DELETE).increment(1);
        debug!(source = SOURCE, "cache entry deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::cache::store::MemoryKvStore;
    use crate::domain::{Article, ArticleId};

    fn accessor() -> (Arc<MemoryKvStore>, CacheAside) {
        let store = Arc::new(MemoryKvStore::new());
        (store.clone(), CacheAside::new(store))
    }

    #[tokio::test]
    async fn write_then_read_returns_value() {
        let (_, cache) = accessor();
        let key = CacheKey::article(&ArticleId::Int(5));
        let article = Article::new(5).with_field("title", "new");

        cache.write(&key, &article).await.expect("write");
        let lookup: Lookup<Article> = cache.read(&key).await.expect("read");
        assert_eq!(lookup, Lookup::Hit(article));
    }

    #[tokio::test]
    async fn delete_then_read_is_absent() {
        let (store, cache) = accessor();
        let key = CacheKey::collection();

        cache.write(&key, &json!([])).await.expect("write");
        cache.delete(&key).await.expect("delete");

        let lookup: Lookup<Value> = cache.read(&key).await.expect("read");
        assert_eq!(lookup, Lookup::Absent);
        assert!(!store.contains(&key));
    }

    #[tokio::test]
    async fn stored_null_is_a_hit() {
        let (_, cache) = accessor();
        let key = CacheKey::collection();

        cache.write(&key, &Value::Null).await.expect("write");
        let lookup: Lookup<Value> = cache.read(&key).await.expect("read");
        assert_eq!(lookup, Lookup::Hit(Value::Null));
    }

    #[tokio::test]
    async fn corrupt_entry_reads_as_absent() {
        let (store, cache) = accessor();
        let key = CacheKey::collection();
        store
            .put(&key, "[{\"id\":".to_string())
            .await
            .expect("seed corrupt entry");

        let lookup: Lookup<Vec<Article>> = cache.read(&key).await.expect("read");
        assert_eq!(lookup, Lookup::Absent);
    }

    #[tokio::test]
    async fn repeated_reads_agree() {
        let (_, cache) = accessor();
        let key = CacheKey::collection();
        cache
            .write(&key, &vec![Article::new(1), Article::new(2)])
            .await
            .expect("write");

        let first: Lookup<Vec<Article>> = cache.read(&key).await.expect("first read");
        let second: Lookup<Vec<Article>> = cache.read(&key).await.expect("second read");
        assert_eq!(first, second);
        assert!(first.is_hit());
    }
}
