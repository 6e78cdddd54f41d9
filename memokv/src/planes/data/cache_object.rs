use crate::domain::KeyFn;
use crate::memoize::{Memoized, WritePolicy};
use crate::planes::data::operation::EntryStore;
use crate::ports::KeyValueStore;
use async_trait::async_trait;
use shared::{Error, Result, TtlSecs};
use std::fmt::Debug;
use std::sync::Arc;

/// Thin wrapper over a store handle: raw text values, caller-built keys, no namespacing
#[derive(Clone)]
pub struct CacheObject {
    store: Arc<dyn KeyValueStore>,
}

impl CacheObject {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Raw stored text, without deserialization
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        self.store.get(key).await
    }

    /// `ttl_secs == 0` stores without expiry
    pub async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        match TtlSecs::non_zero(ttl_secs) {
            Some(ttl) => self.store.set_ex(key, ttl, value).await,
            None => self.store.set(key, value).await,
        }
    }

    pub async fn del(&self, key: &str) -> Result<bool> {
        self.store.del(key).await
    }

    /// Wrap `func` so results are cached under `key_fn(args)` for `ttl_secs` seconds.
    /// A failed cache write is logged; the computed value is still returned.
    pub fn memoize<F, G>(
        &self,
        func: F,
        ttl_secs: u64,
        key_fn: G,
    ) -> Result<Memoized<CacheObject, KeyFn<G>, F>> {
        let ttl = TtlSecs::non_zero(ttl_secs).ok_or_else(|| {
            Error::InvalidArgument("ttl must be a number greater than 0".to_string())
        })?;

        Ok(Memoized::new(
            self.clone(),
            KeyFn(key_fn),
            func,
            Some(ttl),
            WritePolicy::LogAndContinue,
        ))
    }
}

impl Debug for CacheObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheObject")
            .field("store", &"<dyn KeyValueStore>")
            .finish()
    }
}

#[async_trait]
impl EntryStore for CacheObject {
    async fn read_entry(&self, key: &str) -> Result<Option<String>> {
        self.get(key).await
    }

    async fn write_entry(&self, key: &str, text: &str, ttl: Option<TtlSecs>) -> Result<()> {
        self.set(key, text, ttl.map_or(0, |t| t.0)).await
    }

    async fn remove_entry(&self, key: &str) -> Result<bool> {
        self.del(key).await
    }
}
