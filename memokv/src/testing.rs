// In-memory store double that records every call and can be told to fail

use crate::ports::{KeyValueStore, StoreConnector};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared::config::StoreConfig;
use shared::{Error, Result, TtlSecs};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Default)]
pub struct RecordingStore {
    entries: Mutex<HashMap<String, (String, Option<u64>)>>,
    calls: Mutex<Vec<String>>,
    pub fail_get: AtomicBool,
    pub fail_set: AtomicBool,
    pub fail_expire: AtomicBool,
    pub fail_del: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).map(|(value, _)| value.clone())
    }

    pub fn ttl_of(&self, key: &str) -> Option<u64> {
        self.entries.lock().get(key).and_then(|(_, ttl)| *ttl)
    }

    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .insert(key.to_string(), (value.to_string(), None));
    }

    /// Simulates the store expiring an entry
    pub fn evict(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }

    fn check(flag: &AtomicBool, op: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            Err(Error::Store(format!("{} refused", op)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KeyValueStore for RecordingStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.record(format!("get {}", key));
        Self::check(&self.fail_get, "get")?;
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.record(format!("set {} {}", key, value));
        Self::check(&self.fail_set, "set")?;
        self.entries
            .lock()
            .insert(key.to_string(), (value.to_string(), None));
        Ok(())
    }

    async fn set_ex(&self, key: &str, ttl: TtlSecs, value: &str) -> Result<()> {
        self.record(format!("setex {} {} {}", key, ttl.0, value));
        Self::check(&self.fail_set, "setex")?;
        self.entries
            .lock()
            .insert(key.to_string(), (value.to_string(), Some(ttl.0)));
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: TtlSecs) -> Result<bool> {
        self.record(format!("expire {} {}", key, ttl.0));
        Self::check(&self.fail_expire, "expire")?;
        match self.entries.lock().get_mut(key) {
            Some(entry) => {
                entry.1 = Some(ttl.0);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn del(&self, key: &str) -> Result<bool> {
        self.record(format!("del {}", key));
        Self::check(&self.fail_del, "del")?;
        Ok(self.entries.lock().remove(key).is_some())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.record(format!("keys {}", pattern));
        let pattern = glob::Pattern::new(pattern)
            .map_err(|e| Error::InvalidArgument(format!("bad key pattern: {}", e)))?;
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .keys()
            .filter(|k| pattern.matches(k))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn close(&self) -> Result<()> {
        self.record("close".to_string());
        Ok(())
    }
}

/// Hands out the same recording store on every connect
pub struct RecordingConnector {
    pub store: Arc<RecordingStore>,
    pub connects: AtomicUsize,
}

impl RecordingConnector {
    pub fn new(store: Arc<RecordingStore>) -> Self {
        Self {
            store,
            connects: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl StoreConnector for RecordingConnector {
    async fn connect(&self, _config: &StoreConfig) -> Result<Arc<dyn KeyValueStore>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.store.clone())
    }
}
