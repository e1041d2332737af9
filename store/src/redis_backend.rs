use crate::backend::{BackendError, PrimaryBackend};
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;

/// Redis primary backend.
///
/// The connection is established lazily so the service can start (and serve
/// from the fallback) while Redis is down.
pub struct RedisBackend {
    client: redis::Client,
    connection: Mutex<Option<ConnectionManager>>,
    op_timeout: Duration,
}

impl RedisBackend {
    pub fn new(url: &str, op_timeout: Duration) -> Result<Self, BackendError> {
        let client = redis::Client::open(url)?;
        Ok(RedisBackend {
            client,
            connection: Mutex::new(None),
            op_timeout,
        })
    }

    /// Returns the shared connection, establishing it on first use.
    ///
    /// The lock is not held while connecting, so during an outage concurrent
    /// callers each time out on their own instead of queueing.
    async fn connection(&self) -> Result<ConnectionManager, BackendError> {
        if let Some(conn) = self.connection.lock().await.as_ref() {
            return Ok(conn.clone());
        }

        let config = ConnectionManagerConfig::new().set_number_of_retries(1);
        let conn = timeout(
            self.op_timeout,
            self.client.get_connection_manager_with_config(config),
        )
        .await
        .map_err(|_| BackendError::Timeout)?
        .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        let mut guard = self.connection.lock().await;
        match guard.as_ref() {
            // another caller won the race
            Some(existing) => Ok(existing.clone()),
            None => {
                tracing::info!("connected to redis");
                *guard = Some(conn.clone());
                Ok(conn)
            }
        }
    }

    async fn run<T, F>(&self, fut: F) -> Result<T, BackendError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        Ok(timeout(self.op_timeout, fut)
            .await
            .map_err(|_| BackendError::Timeout)??)
    }
}

fn ttl_secs(ttl: Option<Duration>) -> Option<u64> {
    ttl.map(|d| d.as_secs()).filter(|secs| *secs > 0)
}

#[async_trait]
impl PrimaryBackend for RedisBackend {
    async fn ping(&self) -> Result<(), BackendError> {
        let mut conn = self.connection().await?;
        let _: String = self
            .run(redis::cmd("PING").query_async(&mut conn))
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let mut conn = self.connection().await?;
        self.run(conn.get(key)).await
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), BackendError> {
        let mut conn = self.connection().await?;
        match ttl_secs(ttl) {
            Some(secs) => self.run(conn.set_ex(key, value, secs)).await,
            None => self.run(conn.set(key, value)).await,
        }
    }

    async fn set_list(
        &self,
        key: &str,
        values: &[String],
        ttl: Option<Duration>,
    ) -> Result<(), BackendError> {
        if values.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection().await?;
        let mut pipe = redis::pipe();
        pipe.atomic().rpush(key, values.to_vec()).ignore();
        if let Some(secs) = ttl_secs(ttl) {
            pipe.expire(key, secs as i64).ignore();
        }
        self.run(pipe.query_async(&mut conn)).await
    }

    async fn lrange(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, BackendError> {
        let mut conn = self.connection().await?;
        self.run(conn.lrange(key, start, stop)).await
    }

    async fn flush_all(&self) -> Result<(), BackendError> {
        let mut conn = self.connection().await?;
        self.run(redis::cmd("FLUSHDB").query_async(&mut conn)).await
    }
}
