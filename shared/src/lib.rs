// shared/src/lib.rs

use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("cache must be initialized before use")]
    NotInitialized,
    #[error("store: {0}")]
    Store(String),
    #[error("serialization: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Time-to-live of a cache entry, in whole seconds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TtlSecs(pub u64);

impl TtlSecs {
    /// `None` for zero, mirroring stores where a zero TTL means "no expiry"
    pub fn non_zero(secs: u64) -> Option<Self> {
        (secs > 0).then_some(TtlSecs(secs))
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.0)
    }
}

pub mod config;
