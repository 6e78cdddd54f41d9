use async_trait::async_trait;
use shared::{Result, TtlSecs};

/// Text-level entry operations a memoizer runs against.
/// Implementors decide key qualification and how a TTL reaches the store.
#[async_trait]
pub trait EntryStore: Clone + Send + Sync + 'static {
    async fn read_entry(&self, key: &str) -> Result<Option<String>>;

    async fn write_entry(&self, key: &str, text: &str, ttl: Option<TtlSecs>) -> Result<()>;

    async fn remove_entry(&self, key: &str) -> Result<bool>;

    /// The key `key` is stored under
    fn entry_key(&self, key: &str) -> String {
        key.to_string()
    }
}
