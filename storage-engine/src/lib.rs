use async_trait::async_trait;
use memokv::ports::{KeyValueStore, StoreConnector};
use shared::config::{Backend, StoreConfig};
use shared::Result;
use std::sync::Arc;

pub mod moka_store;
#[cfg(feature = "redis")]
pub mod redis_store;

pub use moka_store::MokaStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;

/// Opens a fresh in-process store per connect
#[derive(Clone, Copy, Debug, Default)]
pub struct MokaConnector;

#[async_trait]
impl StoreConnector for MokaConnector {
    async fn connect(&self, _config: &StoreConfig) -> Result<Arc<dyn KeyValueStore>> {
        Ok(Arc::new(MokaStore::new()))
    }
}

/// Connects to the Redis server named by the config's host and port
#[cfg(feature = "redis")]
#[derive(Clone, Copy, Debug, Default)]
pub struct RedisConnector;

#[cfg(feature = "redis")]
#[async_trait]
impl StoreConnector for RedisConnector {
    async fn connect(&self, config: &StoreConfig) -> Result<Arc<dyn KeyValueStore>> {
        let store = RedisStore::connect(&config.redis_url()).await?;
        Ok(Arc::new(store))
    }
}

/// Connector for the backend a config asks for
pub fn connector_for(backend: Backend) -> Result<Arc<dyn StoreConnector>> {
    match backend {
        Backend::Memory => Ok(Arc::new(MokaConnector)),
        #[cfg(feature = "redis")]
        Backend::Redis => Ok(Arc::new(RedisConnector)),
        #[cfg(not(feature = "redis"))]
        Backend::Redis => Err(shared::Error::InvalidArgument(
            "built without the `redis` feature".to_string(),
        )),
    }
}
