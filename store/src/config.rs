use serde::Deserialize;
use std::time::Duration;
use url::Url;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("unsupported redis url scheme: {0}")]
    InvalidRedisScheme(String),
    #[error("op_timeout_ms cannot be 0")]
    ZeroTimeout,
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
#[serde(tag = "type")]
pub enum BackendType {
    Redis { url: Url },
    Memory,
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_op_timeout_ms() -> u64 {
    500
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Config {
    pub backend: BackendType,
    /// Delay before the single liveness retry
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Upper bound for any single primary command, connecting included
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend: BackendType::Memory,
            retry_delay_ms: default_retry_delay_ms(),
            op_timeout_ms: default_op_timeout_ms(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let BackendType::Redis { url } = &self.backend
            && !matches!(url.scheme(), "redis" | "rediss")
        {
            return Err(ValidationError::InvalidRedisScheme(url.scheme().to_string()));
        }
        if self.op_timeout_ms == 0 {
            return Err(ValidationError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}
