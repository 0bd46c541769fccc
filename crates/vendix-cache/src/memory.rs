//! In-process [`Cache`] implementation.
//!
//! Backed by [`dashmap`] for lock-free concurrent access, the same
//! primitive the teacher uses for its auth session/provider maps. Expiry is
//! checked lazily on read rather than via a background sweep, since a
//! single-process cache has no eviction-pressure concern a sweep would
//! address; `purge_expired` is exposed for callers who do want to reclaim
//! memory from never-read stale entries.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::{Cache, CacheError};

#[derive(Debug)]
struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-memory, single-process [`Cache`].
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: DashMap<String, Entry>,
}

impl InMemoryCache {
    /// Construct an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry whose TTL has elapsed. Not required for
    /// correctness — reads already treat expired entries as misses — but
    /// useful for bounding memory in long-running processes.
    pub fn purge_expired(&self) {
        self.entries.retain(|_, entry| !entry.is_expired());
    }

    /// Number of entries currently stored, including expired-but-unpurged
    /// ones. Exposed for tests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => Ok(Some(entry.value.clone())),
            Some(_) => {
                drop(self.entries.remove(key));
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_raw(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn delete_pattern(&self, prefix: &str) -> Result<u64, CacheError> {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        Ok((before - self.entries.len()) as u64)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.entries.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TypedCache;

    #[tokio::test]
    async fn get_or_populate_calls_populate_only_on_miss() {
        let cache = TypedCache::new(InMemoryCache::new());
        let mut calls = 0;
        for _ in 0..3 {
            let value: i32 = cache
                .get_or_populate::<i32, _, _, std::convert::Infallible>("k", Duration::from_secs(60), || async {
                    calls += 1;
                    Ok(42)
                })
                .await
                .unwrap();
            assert_eq!(value, 42);
        }
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn expired_entry_is_treated_as_miss() {
        let backend = InMemoryCache::new();
        backend
            .set_raw("k", b"v".to_vec(), Duration::from_millis(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(backend.get_raw("k").await.unwrap(), None);
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_only_the_exact_key() {
        let backend = InMemoryCache::new();
        backend
            .set_raw("products.get_by_id.1", b"1".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        backend
            .set_raw("products.get_by_id.19", b"19".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        backend.delete("products.get_by_id.1").await.unwrap();

        assert_eq!(backend.get_raw("products.get_by_id.1").await.unwrap(), None);
        assert_eq!(
            backend.get_raw("products.get_by_id.19").await.unwrap(),
            Some(b"19".to_vec())
        );
    }

    #[tokio::test]
    async fn delete_pattern_removes_matching_prefix_only() {
        let backend = InMemoryCache::new();
        backend
            .set_raw("products.get_all", b"1".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        backend
            .set_raw("products.get_by_id.1", b"2".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        backend
            .set_raw("user.1.addresses", b"3".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        let removed = backend.delete_pattern("products").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn purge_expired_reclaims_stale_entries() {
        let backend = InMemoryCache::new();
        backend
            .set_raw("k1", b"v".to_vec(), Duration::from_millis(1))
            .await
            .unwrap();
        backend
            .set_raw("k2", b"v".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        backend.purge_expired();
        assert_eq!(backend.len(), 1);
    }
}
