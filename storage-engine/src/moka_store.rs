use async_trait::async_trait;
use glob::Pattern;
use memokv::ports::KeyValueStore;
use moka::Expiry;
use moka::future::Cache;
use shared::{Error, Result, TtlSecs};
use std::fmt::Debug;
use std::time::{Duration, Instant};

/// Stored text plus the TTL it was written with
#[derive(Clone, Debug)]
struct StoredValue {
    text: String,
    ttl: Option<Duration>,
}

/// Expires each entry after the TTL carried by its latest write.
/// A write without TTL clears any previous expiry, like a plain `SET`.
struct PerEntryExpiry;

impl Expiry<String, StoredValue> for PerEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// Moka-based in-process store with per-entry TTL
/// Stands in for a networked store in single-process deployments and tests
pub struct MokaStore {
    cache: Cache<String, StoredValue>,
}

impl MokaStore {
    /// Create an unbounded store
    pub fn new() -> Self {
        Self {
            cache: Cache::builder().expire_after(PerEntryExpiry).build(),
        }
    }

    /// Create a store holding at most `max_entries` entries
    pub fn new_bounded(max_entries: u64) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_entries)
                .expire_after(PerEntryExpiry)
                .build(),
        }
    }

    async fn insert(&self, key: &str, text: &str, ttl: Option<Duration>) {
        let value = StoredValue {
            text: text.to_string(),
            ttl,
        };
        self.cache.insert(key.to_string(), value).await;
    }
}

impl Default for MokaStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MokaStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        // Expired entries are never returned by moka
        Ok(self.cache.get(key).await.map(|value| value.text))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.insert(key, value, None).await;
        Ok(())
    }

    async fn set_ex(&self, key: &str, ttl: TtlSecs, value: &str) -> Result<()> {
        self.insert(key, value, Some(ttl.as_duration())).await;
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: TtlSecs) -> Result<bool> {
        match self.cache.get(key).await {
            Some(current) => {
                self.insert(key, &current.text, Some(ttl.as_duration())).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn del(&self, key: &str) -> Result<bool> {
        Ok(self.cache.remove(key).await.is_some())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let pattern = Pattern::new(pattern)
            .map_err(|e| Error::InvalidArgument(format!("bad key pattern '{}': {}", pattern, e)))?;

        let mut keys: Vec<String> = self
            .cache
            .iter()
            .filter(|(key, _)| pattern.matches(key))
            .map(|(key, _)| key.to_string())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn close(&self) -> Result<()> {
        self.cache.run_pending_tasks().await;
        Ok(())
    }
}

impl Debug for MokaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaStore")
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}
