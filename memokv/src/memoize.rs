use crate::domain::KeyStrategy;
use crate::planes::data::operation::EntryStore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{Error, Result, TtlSecs};
use std::fmt;
use std::future::Future;

/// What a memoizer does when storing a freshly computed result fails
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WritePolicy {
    /// Return the failure to the caller, carrying the computed value
    Propagate,
    /// Log the failure and return the computed value
    LogAndContinue,
}

/// Failure of a memoized call
#[derive(Debug)]
pub enum MemoError<E, T> {
    /// The wrapped function failed. Nothing was cached.
    Compute(E),
    /// The result was computed but could not be stored under `key`, the key as written to the store
    Store { key: String, source: Error, value: T },
    /// The entry store was not open. The wrapped function was not run.
    NotInitialized,
}

impl<E, T> MemoError<E, T> {
    /// The computed value, if the failure happened after computing it
    pub fn into_value(self) -> Option<T> {
        match self {
            MemoError::Compute(_) | MemoError::NotInitialized => None,
            MemoError::Store { value, .. } => Some(value),
        }
    }

    pub fn is_compute(&self) -> bool {
        matches!(self, MemoError::Compute(_))
    }
}

impl<E: fmt::Display, T> fmt::Display for MemoError<E, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoError::Compute(err) => write!(f, "memoized function failed: {}", err),
            MemoError::Store { key, source, .. } => {
                write!(f, "failed to cache result under '{}': {}", key, source)
            }
            MemoError::NotInitialized => write!(f, "{}", Error::NotInitialized),
        }
    }
}

impl<E, T> std::error::Error for MemoError<E, T>
where
    E: std::error::Error + 'static,
    T: fmt::Debug,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MemoError::Compute(err) => Some(err),
            MemoError::Store { source, .. } => Some(source),
            MemoError::NotInitialized => None,
        }
    }
}

/// A function wrapped with cache lookup, keyed by a [`KeyStrategy`] over its arguments.
///
/// Holds no state of its own: every hit, miss and write goes through the entry store.
/// There is no single-flight: concurrent misses on one key all compute and the last write wins.
#[derive(Clone)]
pub struct Memoized<S, K, F> {
    store: S,
    keys: K,
    func: F,
    ttl: Option<TtlSecs>,
    write_policy: WritePolicy,
}

impl<S, K, F> Memoized<S, K, F>
where
    S: EntryStore,
{
    pub fn new(store: S, keys: K, func: F, ttl: Option<TtlSecs>, write_policy: WritePolicy) -> Self {
        Self {
            store,
            keys,
            func,
            ttl,
            write_policy,
        }
    }

    /// Key a call with `args` reads and writes
    pub fn key_for<A>(&self, args: &A) -> String
    where
        K: KeyStrategy<A>,
    {
        self.keys.derive_key(args)
    }

    pub async fn call<A, T, E, Fut>(&self, args: A) -> std::result::Result<T, MemoError<E, T>>
    where
        K: KeyStrategy<A>,
        F: Fn(A) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        T: Serialize + DeserializeOwned,
    {
        let key = self.keys.derive_key(&args);

        if let Some(value) = self
            .lookup::<T>(&key)
            .await
            .map_err(|_| MemoError::NotInitialized)?
        {
            return Ok(value);
        }

        let value = (self.func)(args).await.map_err(MemoError::Compute)?;

        let written = match serde_json::to_string(&value) {
            Ok(text) => self.store.write_entry(&key, &text, self.ttl).await,
            Err(e) => Err(e.into()),
        };

        if let Err(source) = written {
            let key = self.store.entry_key(&key);
            match self.write_policy {
                WritePolicy::Propagate => {
                    return Err(MemoError::Store { key, source, value });
                }
                WritePolicy::LogAndContinue => {
                    tracing::warn!("Failed to cache result under '{}': {}", key, source);
                }
            }
        }

        Ok(value)
    }

    /// Deletes the entry a call with `args` would use
    pub async fn remove_key<A>(&self, args: &A) -> Result<bool>
    where
        K: KeyStrategy<A>,
    {
        let key = self.keys.derive_key(args);
        match self.store.remove_entry(&key).await {
            Ok(removed) => {
                tracing::debug!("Removed memoized key '{}' (existed: {})", key, removed);
                Ok(removed)
            }
            Err(e) => {
                tracing::warn!("Failed to remove memoized key '{}': {}", key, e);
                Err(e)
            }
        }
    }

    // Read failures and undecodable entries count as misses; an unopened store does not
    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.store.read_entry(key).await {
            Ok(Some(text)) if !text.is_empty() => match serde_json::from_str(&text) {
                Ok(value) => {
                    tracing::debug!("Cache hit for '{}'", key);
                    Ok(Some(value))
                }
                Err(e) => {
                    tracing::warn!("Discarding undecodable entry '{}': {}", key, e);
                    Ok(None)
                }
            },
            Ok(_) => {
                tracing::debug!("Cache miss for '{}'", key);
                Ok(None)
            }
            Err(Error::NotInitialized) => Err(Error::NotInitialized),
            Err(e) => {
                tracing::warn!("Cache read for '{}' failed, computing instead: {}", key, e);
                Ok(None)
            }
        }
    }
}
