//! Time-to-live cache for fetched responses.
//!
//! Keys describe the request shape (endpoint plus query parameters), so
//! two requests for the same page with the same hints share an entry.
//! Failed fetches are never cached.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// Default time-to-live of a cached response.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

/// A keyed cache whose entries expire after a fixed time-to-live.
pub struct FetchCache<V> {
    entries: Mutex<BTreeMap<String, CacheEntry<V>>>,
}

impl<V> Default for FetchCache<V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
        }
    }
}

impl<V: Clone> FetchCache<V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value for `key` if it is younger than `ttl`,
    /// otherwise runs `fetcher` and caches its successful result.
    ///
    /// The lock is not held while `fetcher` runs.
    ///
    /// # Errors
    ///
    /// Returns whatever error `fetcher` returns.
    pub async fn fetch_with_cache<E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        fetcher: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key, ttl) {
            log::trace!("cache hit: {key}");
            return Ok(value);
        }

        log::trace!("cache miss: {key}");
        let value = fetcher().await?;
        self.insert(key, value.clone());
        Ok(value)
    }

    /// The cached value for `key`, if present and younger than `ttl`.
    /// An expired entry is dropped.
    pub fn get(&self, key: &str, ttl: Duration) -> Option<V> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let entry = entries.get(key)?;
        if entry.stored_at.elapsed() < ttl {
            return Some(entry.value.clone());
        }
        log::trace!("cache expired: {key}");
        entries.remove(key);
        None
    }

    /// Stores `value` under `key`, replacing any previous entry.
    pub fn insert(&self, key: &str, value: V) {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(
                key.to_string(),
                CacheEntry {
                    value,
                    stored_at: Instant::now(),
                },
            );
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }

    /// Number of stored entries. Expired entries count until looked up.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
