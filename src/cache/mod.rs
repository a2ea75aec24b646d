//! # TTL Cache
//!
//! In-memory time-bounded cache used to avoid redundant vault calls.
//!
//! Expiry is lazy: an expired entry behaves exactly like an absent one on
//! read and is only removed when overwritten or invalidated; there is no
//! background sweep. Callers populate the cache after a successful upstream
//! fetch; the cache itself never calls the vault.
//!
//! Caches are explicitly constructed and injected into the services that use
//! them, so tests can supply isolated instances.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// A cached value with its absolute expiry instant.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Time-bounded cache from a composite key to a value.
///
/// # Thread Safety
///
/// Uses `RwLock` for thread-safe access from concurrent retrieval and
/// rotation calls. Entries are immutable once written; writers replace them
/// wholesale, so readers see either the old or the new entry, never a
/// partial one.
#[derive(Debug, Default)]
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Create an empty cache.
    pub fn new() -> Self {
        Self { entries: RwLock::new(HashMap::new()) }
    }

    /// Get a value if it is present and not expired.
    ///
    /// An expired-but-present entry is treated identically to an absent one;
    /// the read does not evict it.
    pub async fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.is_live(Instant::now()) {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Insert a value, unconditionally overwriting any existing entry and
    /// resetting its expiry to `now + ttl`.
    pub async fn put(&self, key: K, value: V, ttl: Duration) {
        let entry = CacheEntry { value, expires_at: Instant::now() + ttl };
        let mut entries = self.entries.write().await;
        entries.insert(key, entry);
    }

    /// Remove a single entry.
    pub async fn invalidate(&self, key: &K) {
        let mut entries = self.entries.write().await;
        entries.remove(key);
    }

    /// Remove all entries.
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        let count = entries.len();
        entries.clear();
        tracing::debug!(count = count, "Cleared cache");
    }

    /// Number of entries currently stored, including expired ones that have
    /// not yet been overwritten.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// True when the cache holds no entries at all.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Composite key for the session-token cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenCacheKey {
    pub url: String,
    pub account: String,
    pub login: String,
}

impl TokenCacheKey {
    pub fn new(
        url: impl Into<String>,
        account: impl Into<String>,
        login: impl Into<String>,
    ) -> Self {
        Self { url: url.into(), account: account.into(), login: login.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_get_after_put_returns_value() {
        let cache: TtlCache<String, String> = TtlCache::new();
        cache.put("k".to_string(), "v".to_string(), Duration::from_secs(60)).await;
        assert_eq!(cache.get(&"k".to_string()).await, Some("v".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_absent() {
        let cache: TtlCache<String, String> = TtlCache::new();
        cache.put("k".to_string(), "v".to_string(), Duration::from_secs(60)).await;

        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(cache.get(&"k".to_string()).await, None);
        // Lazy expiry: the entry is still physically present until overwritten.
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_overwrites_and_resets_expiry() {
        let cache: TtlCache<String, String> = TtlCache::new();
        cache.put("k".to_string(), "v1".to_string(), Duration::from_secs(60)).await;

        tokio::time::advance(Duration::from_secs(59)).await;
        cache.put("k".to_string(), "v2".to_string(), Duration::from_secs(60)).await;

        // Past the first entry's expiry but within the second's.
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(cache.get(&"k".to_string()).await, Some("v2".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_overwrites_expired_entry() {
        let cache: TtlCache<String, String> = TtlCache::new();
        cache.put("k".to_string(), "old".to_string(), Duration::from_secs(1)).await;
        tokio::time::advance(Duration::from_secs(5)).await;

        cache.put("k".to_string(), "new".to_string(), Duration::from_secs(60)).await;
        assert_eq!(cache.get(&"k".to_string()).await, Some("new".to_string()));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_invalidate_single_key() {
        let cache: TtlCache<String, String> = TtlCache::new();
        cache.put("a".to_string(), "1".to_string(), Duration::from_secs(60)).await;
        cache.put("b".to_string(), "2".to_string(), Duration::from_secs(60)).await;

        cache.invalidate(&"a".to_string()).await;

        assert_eq!(cache.get(&"a".to_string()).await, None);
        assert_eq!(cache.get(&"b".to_string()).await, Some("2".to_string()));
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let cache: TtlCache<String, String> = TtlCache::new();
        cache.put("a".to_string(), "1".to_string(), Duration::from_secs(60)).await;
        cache.put("b".to_string(), "2".to_string(), Duration::from_secs(60)).await;

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[test]
    fn test_token_cache_key_equality() {
        let k1 = TokenCacheKey::new("https://v", "acct", "svc");
        let k2 = TokenCacheKey::new("https://v", "acct", "svc");
        let k3 = TokenCacheKey::new("https://v", "acct", "other");
        assert_eq!(k1, k2);
        assert_ne!(k1, k3);
    }
}
