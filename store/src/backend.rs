//! The primary networked key/value backend behind the resilient store.
use async_trait::async_trait;
use std::time::Duration;

/// Value held under one cache key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheValue {
    Scalar(String),
    List(Vec<String>),
}

impl From<String> for CacheValue {
    fn from(value: String) -> Self {
        CacheValue::Scalar(value)
    }
}

impl From<&str> for CacheValue {
    fn from(value: &str) -> Self {
        CacheValue::Scalar(value.to_string())
    }
}

impl From<Vec<String>> for CacheValue {
    fn from(values: Vec<String>) -> Self {
        CacheValue::List(values)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("primary backend unavailable: {0}")]
    Unavailable(String),
    #[error("primary backend timed out")]
    Timeout,
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Commands the resilient store needs from its primary backend.
///
/// Implementations report connectivity and command failures as errors; the
/// store decides how to degrade.
#[async_trait]
pub trait PrimaryBackend: Send + Sync {
    async fn ping(&self) -> Result<(), BackendError>;

    async fn get(&self, key: &str) -> Result<Option<String>, BackendError>;

    /// Overwrites `key` with a scalar. `None` means no expiry.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>)
    -> Result<(), BackendError>;

    /// Appends `values` to the list at `key` in order, creating it when
    /// absent. The ttl, when given, is reset.
    async fn set_list(
        &self,
        key: &str,
        values: &[String],
        ttl: Option<Duration>,
    ) -> Result<(), BackendError>;

    /// Inclusive range, negative indexes count from the end.
    async fn lrange(&self, key: &str, start: isize, stop: isize)
    -> Result<Vec<String>, BackendError>;

    async fn flush_all(&self) -> Result<(), BackendError>;
}
