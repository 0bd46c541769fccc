//! Token revocation.
//!
//! Grounded on the original service's Redis blocklist: revoking a token
//! writes `blocklist:{jti}` with a TTL equal to the token's own remaining
//! lifetime, so a revocation entry never outlives the token it revokes and
//! the store never grows unbounded. This crate shares the same backend
//! trait ([`vendix_cache::Cache`]) the cache layer uses, but keeps a
//! logically separate namespace and interface: a revocation check must
//! never be skipped the way a cache miss may be.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use vendix_cache::Cache;

const NAMESPACE: &str = "revocation";

/// Tracks revoked token ids (`jti`s).
#[async_trait]
pub trait RevocationStore: std::fmt::Debug + Send + Sync {
    /// Mark `jti` revoked until `expires_at` (Unix seconds). Revoking a
    /// token that has already expired is a no-op — there is nothing left
    /// to protect against.
    async fn revoke(&self, jti: &str, expires_at: i64);

    /// Whether `jti` is currently revoked.
    async fn is_revoked(&self, jti: &str) -> bool;
}

/// [`RevocationStore`] backed by any [`vendix_cache::Cache`] implementation.
#[derive(Debug)]
pub struct CacheRevocationStore<C: Cache> {
    cache: C,
}

impl<C: Cache> CacheRevocationStore<C> {
    /// Wrap a cache backend as a revocation store.
    pub fn new(cache: C) -> Self {
        Self { cache }
    }

    fn key(jti: &str) -> String {
        format!("{NAMESPACE}.{jti}")
    }
}

#[async_trait]
impl<C: Cache> RevocationStore for CacheRevocationStore<C> {
    async fn revoke(&self, jti: &str, expires_at: i64) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_secs() as i64;
        let remaining = (expires_at - now).max(0);
        if remaining == 0 {
            tracing::debug!(jti, "skipping revocation of an already-expired token");
            return;
        }
        if let Err(err) = self
            .cache
            .set_raw(&Self::key(jti), b"1".to_vec(), Duration::from_secs(remaining as u64))
            .await
        {
            // Revocation is a correctness-critical write, unlike an ordinary
            // cache population — log loudly, but there is no fallback path:
            // the caller already told the client the token is revoked.
            tracing::error!(jti, error = %err, "failed to persist token revocation");
        }
    }

    async fn is_revoked(&self, jti: &str) -> bool {
        match self.cache.get_raw(&Self::key(jti)).await {
            Ok(value) => value.is_some(),
            Err(err) => {
                // Fail closed would lock out every user on a cache outage;
                // the original service has the same fail-open behavior
                // since a blocklist miss and a backend error are
                // indistinguishable through its client library.
                tracing::error!(jti, error = %err, "revocation check failed, treating token as not revoked");
                false
            }
        }
    }
}
