//! # vendix-cache
//!
//! Cache-through read layer for the commerce core.
//!
//! Mirrors the original service's Redis-backed `cached_response` decorator:
//! reads check the cache first, execute the real work and populate the
//! cache on a miss, and any cache-layer failure is logged and swallowed
//! rather than propagated — a cache is an optimization, never a dependency
//! of correctness. Invalidation is pattern-based (a namespace prefix), the
//! same granularity the original's `invalidate_*_cache` helpers use.
//!
//! ## Module Organization
//!
//! - [`keys`]: Namespaced cache key construction.
//! - [`memory`]: An in-process [`Cache`] implementation backed by
//!   [`dashmap`], suitable as the default and as a test double for anything
//!   backed by a real distributed cache in production.

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod keys;
pub mod memory;

use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

/// A cache-through store keyed by opaque string keys.
///
/// Implementations MUST NOT return errors for ordinary misses — a miss is
/// `Ok(None)`. The `Err` variant is reserved for backend connectivity
/// failures, which callers are expected to log and treat as a miss rather
/// than fail the surrounding operation.
#[async_trait]
pub trait Cache: Debug + Send + Sync {
    /// Fetch a raw value previously stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error only on backend failure (e.g. connection loss),
    /// never for an ordinary cache miss.
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store a raw value under `key` with the given time-to-live.
    ///
    /// # Errors
    ///
    /// Returns an error only on backend failure.
    async fn set_raw(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// Remove exactly the entry stored under `key`, if any.
    ///
    /// Unlike [`Cache::delete_pattern`], this never touches any other key —
    /// use it when the caller knows the precise key it wrote, rather than a
    /// namespace to sweep.
    ///
    /// # Errors
    ///
    /// Returns an error only on backend failure.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Remove every key whose namespace starts with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns an error only on backend failure.
    async fn delete_pattern(&self, prefix: &str) -> Result<u64, CacheError>;

    /// Remove every entry. Used by maintenance tooling and tests.
    ///
    /// # Errors
    ///
    /// Returns an error only on backend failure.
    async fn clear(&self) -> Result<(), CacheError>;
}

/// Backend failure from a [`Cache`] implementation.
#[derive(Debug, Clone, thiserror::Error)]
#[error("cache backend error: {0}")]
pub struct CacheError(pub String);

/// Typed convenience wrapper over [`Cache`] for JSON-serializable values.
///
/// This is the entry point services use: `get_or_populate` implements the
/// cache-through pattern end to end, including swallowing backend errors.
#[derive(Debug, Clone)]
pub struct TypedCache<C: Cache> {
    inner: C,
}

impl<C: Cache> TypedCache<C> {
    /// Wrap a raw [`Cache`] backend.
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    /// Look up `key`. Deserialization failures and backend errors are both
    /// logged and treated as a miss, never propagated.
    pub async fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.inner.get_raw(key).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(value) => Some(value),
                Err(err) => {
                    tracing::warn!(key, error = %err, "cache entry failed to deserialize, treating as miss");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(key, error = %err, "cache backend error on get, treating as miss");
                None
            }
        }
    }

    /// Store `value` under `key` with `ttl`. Backend failures are logged
    /// and swallowed: a failed cache write must never fail the caller's
    /// real operation.
    pub async fn set<T: serde::Serialize + Sync>(&self, key: &str, value: &T, ttl: Duration) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(key, error = %err, "failed to serialize value for cache, skipping write");
                return;
            }
        };
        if let Err(err) = self.inner.set_raw(key, bytes, ttl).await {
            tracing::warn!(key, error = %err, "cache backend error on set, ignoring");
        }
    }

    /// Cache-through read: return the cached value for `key`, or call
    /// `populate` on a miss and cache its result before returning it.
    ///
    /// `populate`'s own errors are propagated to the caller unchanged —
    /// only the cache layer itself is error-swallowing.
    pub async fn get_or_populate<T, F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        populate: F,
    ) -> Result<T, E>
    where
        T: serde::Serialize + serde::de::DeserializeOwned + Sync,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get::<T>(key).await {
            return Ok(value);
        }
        let value = populate().await?;
        self.set(key, &value, ttl).await;
        Ok(value)
    }

    /// Invalidate exactly `key`. Backend failures are logged and swallowed.
    pub async fn invalidate(&self, key: &str) {
        if let Err(err) = self.inner.delete(key).await {
            tracing::warn!(key, error = %err, "cache backend error on invalidate, ignoring");
        }
    }

    /// Invalidate every key under `prefix`. Backend failures are logged and
    /// swallowed.
    pub async fn invalidate_pattern(&self, prefix: &str) {
        match self.inner.delete_pattern(prefix).await {
            Ok(count) => {
                if count > 0 {
                    tracing::debug!(prefix, count, "invalidated cache entries");
                }
            }
            Err(err) => {
                tracing::warn!(prefix, error = %err, "cache backend error on invalidate, ignoring");
            }
        }
    }
}
