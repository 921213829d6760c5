// caching/src/caching.rs
//! Device-local key-value storage: the patient record cache mirror and the
//! persisted session flags.
use std::fmt;

use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use models::errors::RecordResult;

mod cache_mirror;
mod sled_store;

pub use cache_mirror::{cache_key, CacheMirror, CACHE_KEY_PREFIX, SESSION_KEY};
pub use sled_store::SledLocalStore;

#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get(&self, key: &str) -> RecordResult<Option<Vec<u8>>>;
    async fn put(&self, key: &str, value: Vec<u8>) -> RecordResult<()>;
    async fn remove(&self, key: &str) -> RecordResult<()>;
    fn get_type(&self) -> &'static str;
}

/// Process-lifetime store. Entries past `capacity` may be evicted, which the
/// mirror treats as an ordinary miss.
#[derive(Clone)]
pub struct MemoryLocalStore {
    inner: MokaCache<String, Vec<u8>>,
}

impl MemoryLocalStore {
    pub fn new(capacity: u64) -> Self {
        MemoryLocalStore {
            inner: MokaCache::new(capacity),
        }
    }
}

impl fmt::Debug for MemoryLocalStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryLocalStore")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}

#[async_trait]
impl LocalStore for MemoryLocalStore {
    async fn get(&self, key: &str) -> RecordResult<Option<Vec<u8>>> {
        Ok(self.inner.get(key).await)
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> RecordResult<()> {
        self.inner.insert(key.to_string(), value).await;
        Ok(())
    }

    async fn remove(&self, key: &str) -> RecordResult<()> {
        self.inner.invalidate(key).await;
        Ok(())
    }

    fn get_type(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_put_get_remove() {
        let store = MemoryLocalStore::new(16);
        assert_eq!(store.get("k").await.unwrap(), None);
        store.put("k", b"v".to_vec()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));
        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
