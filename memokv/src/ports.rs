#![deny(clippy::all)]

use async_trait::async_trait;
use shared::config::StoreConfig;
use shared::{Result, TtlSecs};
use std::sync::Arc;

// Ports are the pluggable extension points for the external key-value store

/// Port for opening a store connection from configuration
/// This allows different store backends to be plugged into a context
#[async_trait]
pub trait StoreConnector: Send + Sync + 'static {
    async fn connect(&self, config: &StoreConfig) -> Result<Arc<dyn KeyValueStore>>;
}

/// Port for the text-valued key-value store (e.g., Redis)
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn set_ex(&self, key: &str, ttl: TtlSecs, value: &str) -> Result<()>;
    /// Returns false when the key does not exist
    async fn expire(&self, key: &str, ttl: TtlSecs) -> Result<bool>;
    /// Returns false when the key did not exist
    async fn del(&self, key: &str) -> Result<bool>;
    /// Glob-style pattern (`*`, `?`, `[...]`)
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;
    async fn close(&self) -> Result<()>;
}
