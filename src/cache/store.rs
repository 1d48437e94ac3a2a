//! Key-value store seam and the in-process implementation.

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

use super::keys::CacheKey;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("kv transport error: {0}")]
    Transport(String),
    #[error("kv backend returned status {status}: {message}")]
    Backend { status: u16, message: String },
}

impl StoreError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}

/// An opaque string store addressed by cache key.
///
/// Implementations own eviction and expiry; callers only see present or absent.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous entry.
    async fn put(&self, key: &CacheKey, value: String) -> Result<(), StoreError>;

    /// Remove the entry under `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &CacheKey) -> Result<(), StoreError>;
}

/// Process-local store backed by a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: DashMap<CacheKey, String>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Raw stored text, bypassing decoding.
    pub fn raw(&self, key: &CacheKey) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, StoreError> {
        Ok(self.raw(key))
    }

    async fn put(&self, key: &CacheKey, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.clone(), value);
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ArticleId;

    #[tokio::test]
    async fn memory_store_put_get_delete() {
        let store = MemoryKvStore::new();
        let key = CacheKey::article(&ArticleId::Int(1));

        assert!(store.get(&key).await.expect("get").is_none());

        store.put(&key, "first".to_string()).await.expect("put");
        store.put(&key, "second".to_string()).await.expect("overwrite");
        assert_eq!(store.get(&key).await.expect("get").as_deref(), Some("second"));
        assert_eq!(store.len(), 1);

        store.delete(&key).await.expect("delete");
        assert!(store.get(&key).await.expect("get").is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn deleting_absent_key_is_a_no_op() {
        let store = MemoryKvStore::new();
        store
            .delete(&CacheKey::collection())
            .await
            .expect("absent delete succeeds");
        assert!(store.is_empty());
    }
}
