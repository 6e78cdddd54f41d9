use crate::Error;
use std::str::FromStr;
use tracing::warn;

/// Which store adapter a connector should produce
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Redis,   // networked store
    Memory,  // in-process store, lost on exit
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(Backend::Redis),
            "memory" | "mem" => Ok(Backend::Memory),
            other => Err(Error::InvalidArgument(format!("unknown backend '{}'", other))),
        }
    }
}

/// Options bundle recognized at initialization
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheOptions {
    /// Prefix for every key managed by a context
    pub namespace: String,
}

impl CacheOptions {
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub backend: Backend,
    pub options: CacheOptions,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PORT, Self::DEFAULT_HOST, CacheOptions::default())
    }
}

impl StoreConfig {
    pub const DEFAULT_HOST: &str = "127.0.0.1";
    pub const DEFAULT_PORT: u16 = 6379;

    pub fn new(port: u16, host: impl Into<String>, options: CacheOptions) -> Self {
        Self {
            host: host.into(),
            port,
            backend: Backend::Redis,
            options,
        }
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn from_env() -> Self {
        let host =
            std::env::var("MEMOKV_HOST").unwrap_or_else(|_| Self::DEFAULT_HOST.to_string());
        let port = match std::env::var("MEMOKV_PORT") {
            Ok(raw) => raw.parse::<u16>().unwrap_or_else(|_| {
                warn!("MEMOKV_PORT '{}' is not a port, using {}", raw, Self::DEFAULT_PORT);
                Self::DEFAULT_PORT
            }),
            Err(_) => Self::DEFAULT_PORT,
        };
        let backend = match std::env::var("MEMOKV_BACKEND") {
            Ok(raw) => raw.parse::<Backend>().unwrap_or_else(|e| {
                warn!("{}, falling back to redis", e);
                Backend::Redis
            }),
            Err(_) => Backend::Redis,
        };
        let namespace = std::env::var("MEMOKV_NAMESPACE").unwrap_or_default();

        Self {
            host,
            port,
            backend,
            options: CacheOptions::with_namespace(namespace),
        }
    }

    /// Connection URL for networked backends
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/", self.host, self.port)
    }
}
