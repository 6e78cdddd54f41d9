use crate::domain::{KeyTemplate, Namespace};
use crate::memoize::{Memoized, WritePolicy};
use crate::planes::data::operation::EntryStore;
use crate::ports::{KeyValueStore, StoreConnector};
use async_trait::async_trait;
use futures::future::try_join_all;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::config::StoreConfig;
use shared::{Error, Result, TtlSecs};
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::RwLock;

struct ContextInner {
    config: StoreConfig,
    namespace: Namespace,
    // None until opened, and again after close
    connection: RwLock<Option<Arc<dyn KeyValueStore>>>,
}

/// One store connection plus one namespace, shared by everything composed into a process.
/// Cloning is cheap and every clone sees the same lifecycle (`open` -> ready -> `close`).
#[derive(Clone)]
pub struct CacheContext {
    inner: Arc<ContextInner>,
}

impl Debug for CacheContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheContext")
            .field("host", &self.inner.config.host)
            .field("port", &self.inner.config.port)
            .field("namespace", &self.inner.namespace)
            .finish()
    }
}

impl CacheContext {
    pub fn new(config: StoreConfig) -> Self {
        let namespace = Namespace::new(config.options.namespace.clone());
        Self {
            inner: Arc::new(ContextInner {
                config,
                namespace,
                connection: RwLock::new(None),
            }),
        }
    }

    /// Connect through `connector` unless already open; either way returns the live connection
    pub async fn open(&self, connector: &dyn StoreConnector) -> Result<Arc<dyn KeyValueStore>> {
        let mut connection = self.inner.connection.write().await;
        if let Some(store) = connection.as_ref() {
            return Ok(store.clone());
        }

        let store = connector.connect(&self.inner.config).await?;
        tracing::info!(
            "Cache context opened on {}:{} (namespace '{}')",
            self.inner.config.host,
            self.inner.config.port,
            self.inner.namespace.as_str()
        );
        *connection = Some(store.clone());
        Ok(store)
    }

    pub async fn is_open(&self) -> bool {
        self.inner.connection.read().await.is_some()
    }

    /// Closes the connection. Closing a context that is not open is a no-op.
    pub async fn close(&self) -> Result<()> {
        let store = self.inner.connection.write().await.take();
        match store {
            Some(store) => {
                store.close().await?;
                tracing::info!("Cache context closed");
                Ok(())
            }
            None => Ok(()),
        }
    }

    async fn store(&self) -> Result<Arc<dyn KeyValueStore>> {
        self.inner
            .connection
            .read()
            .await
            .clone()
            .ok_or(Error::NotInitialized)
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let text = self.read_entry(key).await?;
        match text {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    /// Stores `value` as JSON; a TTL is applied with a follow-up expire whose failure is only logged
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<TtlSecs>,
    ) -> Result<()> {
        let text = serde_json::to_string(value)?;
        self.write_entry(key, &text, ttl).await
    }

    pub async fn del(&self, key: &str) -> Result<bool> {
        self.remove_entry(key).await
    }

    /// Deletes every key matching `{namespace}::{pattern}`; glob characters in `pattern` apply.
    /// Returns how many keys were deleted, or the first failure.
    pub async fn flush(&self, pattern: &str) -> Result<usize> {
        let store = self.store().await?;
        let matched = store.keys(&self.inner.namespace.qualify(pattern)).await?;

        let deletions = matched.iter().map(|key| store.del(key));
        let deleted = try_join_all(deletions)
            .await?
            .into_iter()
            .filter(|removed| *removed)
            .count();

        tracing::debug!(
            "Flushed {} of {} keys matching '{}'",
            deleted,
            matched.len(),
            pattern
        );
        Ok(deleted)
    }

    /// Wrap `func` so results are cached under the namespaced `template` resolved against the
    /// call arguments. Lookup failures count as misses; a failed write of a computed result is
    /// returned to the caller along with the value.
    pub async fn memoize_template<F>(
        &self,
        template: impl Into<KeyTemplate>,
        func: F,
        ttl: Option<TtlSecs>,
    ) -> Result<Memoized<CacheContext, KeyTemplate, F>> {
        if !self.is_open().await {
            return Err(Error::NotInitialized);
        }

        Ok(Memoized::new(
            self.clone(),
            template.into(),
            func,
            ttl,
            WritePolicy::Propagate,
        ))
    }
}

#[async_trait]
impl EntryStore for CacheContext {
    async fn read_entry(&self, key: &str) -> Result<Option<String>> {
        let store = self.store().await?;
        store.get(&self.inner.namespace.qualify(key)).await
    }

    async fn write_entry(&self, key: &str, text: &str, ttl: Option<TtlSecs>) -> Result<()> {
        let store = self.store().await?;
        let key = self.inner.namespace.qualify(key);
        store.set(&key, text).await?;

        if let Some(ttl) = ttl.filter(|t| t.0 > 0) {
            if let Err(e) = store.expire(&key, ttl).await {
                tracing::warn!("Failed to set {}s expiry on '{}': {}", ttl.0, key, e);
            }
        }
        Ok(())
    }

    async fn remove_entry(&self, key: &str) -> Result<bool> {
        let store = self.store().await?;
        let key = self.inner.namespace.qualify(key);
        let removed = store.del(&key).await?;
        tracing::debug!("Deleted '{}' (existed: {})", key, removed);
        Ok(removed)
    }

    fn entry_key(&self, key: &str) -> String {
        self.inner.namespace.qualify(key)
    }
}
