//! Redis-backed store
//!
//! One `ConnectionManager` per store: commands are multiplexed over a single connection that the
//! manager re-establishes on failure. Nothing here retries a failed command.

use async_trait::async_trait;
use memokv::ports::KeyValueStore;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use shared::{Error, Result, TtlSecs};
use std::fmt::Debug;

fn store_error(op: &str, err: redis::RedisError) -> Error {
    tracing::error!("Redis {} failed: {}", op, err);
    Error::Store(format!("Redis {} failed: {}", op, err))
}

#[derive(Clone)]
pub struct RedisStore {
    url: String,
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to `url`, e.g. `redis://127.0.0.1:6379/`
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| Error::Store(format!("Failed to create Redis client: {}", e)))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| store_error("CONNECT", e))?;

        tracing::info!("Connected to Redis at {}", url);
        Ok(Self {
            url: url.to_string(),
            conn,
        })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| store_error("GET", e))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e| store_error("SET", e))
    }

    async fn set_ex(&self, key: &str, ttl: TtlSecs, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl.0)
            .await
            .map_err(|e| store_error("SETEX", e))
    }

    async fn expire(&self, key: &str, ttl: TtlSecs) -> Result<bool> {
        let seconds = i64::try_from(ttl.0)
            .map_err(|_| Error::InvalidArgument(format!("ttl {} is out of range", ttl.0)))?;
        let mut conn = self.conn.clone();
        conn.expire::<_, bool>(key, seconds)
            .await
            .map_err(|e| store_error("EXPIRE", e))
    }

    async fn del(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let deleted: i64 = conn.del(key).await.map_err(|e| store_error("DEL", e))?;
        Ok(deleted > 0)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        conn.keys::<_, Vec<String>>(pattern)
            .await
            .map_err(|e| store_error("KEYS", e))
    }

    async fn close(&self) -> Result<()> {
        // The manager's connection drops with the last clone
        tracing::debug!("Releasing Redis connection to {}", self.url);
        Ok(())
    }
}

impl Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").field("url", &self.url).finish()
    }
}
