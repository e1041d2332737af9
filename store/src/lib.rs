//! Resilient key/value store: a networked primary backend with an
//! in-process fallback used while the primary is unreachable.

pub mod backend;
pub mod config;
pub mod fallback;
pub mod memory;
pub mod metrics_defs;
pub mod redis_backend;
pub mod store;

pub use backend::{BackendError, CacheValue, PrimaryBackend};
pub use store::{CachedList, ConnectionState, ResilientStore, hashed_key};

use config::{BackendType, Config};
use memory::MemoryBackend;
use redis_backend::RedisBackend;
use std::sync::Arc;

/// Builds the store described by `config`. Nothing is contacted yet.
pub fn from_config(config: &Config) -> Result<ResilientStore, BackendError> {
    let primary: Arc<dyn PrimaryBackend> = match &config.backend {
        BackendType::Redis { url } => Arc::new(RedisBackend::new(url.as_str(), config.op_timeout())?),
        BackendType::Memory => {
            tracing::warn!("using the in-memory primary backend, data is not shared between instances");
            Arc::new(MemoryBackend::new())
        }
    };

    Ok(ResilientStore::new(primary, config.retry_delay()))
}
