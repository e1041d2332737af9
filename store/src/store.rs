use crate::backend::{CacheValue, PrimaryBackend};
use crate::fallback::FallbackMap;
use crate::metrics_defs::{FALLBACK_MISS, FALLBACK_READ, FALLBACK_WRITE, PRIMARY_UNREACHABLE};
use sha2::{Digest, Sha256};
use shared::counter;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::time::sleep;

/// Result of the most recent liveness probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Unknown = 0,
    Probing = 1,
    Connected = 2,
    Disconnected = 3,
}

impl From<u8> for ConnectionState {
    fn from(value: u8) -> Self {
        match value {
            1 => ConnectionState::Probing,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Disconnected,
            _ => ConnectionState::Unknown,
        }
    }
}

/// A list read through the store together with the identifier it was keyed by.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedList {
    pub id: String,
    pub items: Vec<String>,
}

/// Key/value cache backed by a networked primary, degrading to an in-process
/// map when the primary cannot be reached.
///
/// Every operation probes the primary first. None of the public operations
/// fail: connectivity problems resolve to fallback data or an absent value.
pub struct ResilientStore {
    primary: Arc<dyn PrimaryBackend>,
    fallback: FallbackMap,
    retry_delay: Duration,
    last_state: AtomicU8,
}

impl ResilientStore {
    pub fn new(primary: Arc<dyn PrimaryBackend>, retry_delay: Duration) -> Self {
        ResilientStore {
            primary,
            fallback: FallbackMap::new(),
            retry_delay,
            last_state: AtomicU8::new(ConnectionState::Unknown as u8),
        }
    }

    pub fn last_state(&self) -> ConnectionState {
        self.last_state.load(Ordering::Relaxed).into()
    }

    pub fn fallback(&self) -> &FallbackMap {
        &self.fallback
    }

    fn set_state(&self, state: ConnectionState) {
        self.last_state.store(state as u8, Ordering::Relaxed);
    }

    /// Pings the primary, retrying once after the configured delay.
    pub async fn is_connected(&self) -> bool {
        self.set_state(ConnectionState::Probing);

        let state = match self.primary.ping().await {
            Ok(()) => ConnectionState::Connected,
            Err(err) => {
                tracing::debug!(error = %err, "primary ping failed, retrying");
                sleep(self.retry_delay).await;
                match self.primary.ping().await {
                    Ok(()) => ConnectionState::Connected,
                    Err(err) => {
                        tracing::warn!(error = %err, "primary unreachable, using local fallback");
                        counter!(PRIMARY_UNREACHABLE).increment(1);
                        ConnectionState::Disconnected
                    }
                }
            }
        };

        self.set_state(state);
        state == ConnectionState::Connected
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        if self.is_connected().await {
            match self.primary.get(key).await {
                Ok(value) => return value,
                Err(err) => {
                    tracing::warn!(key, error = %err, "primary get failed, reading fallback");
                }
            }
        }

        match self.read_fallback(key)? {
            CacheValue::Scalar(value) => Some(value),
            CacheValue::List(_) => {
                tracing::debug!(key, "fallback entry holds a list, not a scalar");
                None
            }
        }
    }

    pub async fn set(&self, key: &str, value: impl Into<CacheValue>, ttl: Duration) {
        let value = value.into();

        if self.is_connected().await {
            let result = match &value {
                CacheValue::Scalar(v) => self.primary.set(key, v, Some(ttl)).await,
                CacheValue::List(values) => self.primary.set_list(key, values, Some(ttl)).await,
            };
            match result {
                Ok(()) => return,
                Err(err) => {
                    tracing::warn!(key, error = %err, "primary set failed, writing fallback");
                }
            }
        }

        counter!(FALLBACK_WRITE).increment(1);
        self.fallback.insert(key, value, ttl);
    }

    /// Fetches every element of the list identified by `raw_key`.
    ///
    /// The identifier is the text after the first `:` (`"i:42"` -> `"42"`),
    /// the whole key when there is none. The physical key is a hash of it.
    pub async fn get_list(&self, raw_key: &str) -> CachedList {
        let id = identifier(raw_key).to_string();
        let key = hashed_key(&id);

        if self.is_connected().await {
            match self.primary.lrange(&key, 0, -1).await {
                Ok(items) => return CachedList { id, items },
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "primary lrange failed, reading fallback");
                }
            }
        }

        let items = match self.read_fallback(&key) {
            Some(CacheValue::List(items)) => items,
            Some(CacheValue::Scalar(value)) => vec![value],
            None => Vec::new(),
        };
        CachedList { id, items }
    }

    /// Wipes the primary namespace, or only the fallback map when the
    /// primary is unreachable. Meant for test and setup isolation.
    pub async fn clear(&self) {
        if self.is_connected().await {
            match self.primary.flush_all().await {
                Ok(()) => return,
                Err(err) => tracing::warn!(error = %err, "primary flush failed"),
            }
        }
        self.fallback.clear();
    }

    fn read_fallback(&self, key: &str) -> Option<CacheValue> {
        counter!(FALLBACK_READ).increment(1);
        let value = self.fallback.get(key);
        if value.is_none() {
            tracing::debug!(key, "no fallback entry");
            counter!(FALLBACK_MISS).increment(1);
        }
        value
    }
}

fn identifier(raw_key: &str) -> &str {
    raw_key.split_once(':').map_or(raw_key, |(_, id)| id)
}

/// Cache key derived from an identifier: `uid:` + hex SHA-256.
pub fn hashed_key(id: &str) -> String {
    format!("uid:{}", hex::encode(Sha256::digest(id.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;

    fn make_store() -> (Arc<MemoryBackend>, ResilientStore) {
        let backend = Arc::new(MemoryBackend::new());
        let store = ResilientStore::new(backend.clone(), Duration::ZERO);
        (backend, store)
    }

    #[tokio::test]
    async fn test_connected_roundtrip() {
        let (backend, store) = make_store();
        assert_eq!(store.last_state(), ConnectionState::Unknown);

        store.set("k", "v", Duration::from_secs(60)).await;
        assert_eq!(store.get("k").await, Some("v".into()));
        assert_eq!(store.get("missing").await, None);
        assert_eq!(store.last_state(), ConnectionState::Connected);
        assert_eq!(backend.snapshot("k"), Some(CacheValue::Scalar("v".into())));
        assert!(store.fallback().is_empty());
    }

    #[tokio::test]
    async fn test_probe_retries_once() {
        let (backend, store) = make_store();
        backend.set_reachable(false);

        assert!(!store.is_connected().await);
        assert_eq!(backend.ping_count(), 2);
        assert_eq!(store.last_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_disconnected_set_get_uses_fallback() {
        let (backend, store) = make_store();
        backend.set_reachable(false);

        store.set("k", "v", Duration::from_secs(60)).await;
        assert_eq!(store.get("k").await, Some("v".into()));
        assert_eq!(store.fallback().intended_ttl("k"), Some(Duration::from_secs(60)));

        // nothing reached the primary
        assert_eq!(backend.snapshot("k"), None);
        assert_eq!(store.get("other").await, None);
    }

    #[tokio::test]
    async fn test_fallback_miss_is_not_escalated() {
        let (backend, store) = make_store();
        store.set("k", "primary", Duration::from_secs(60)).await;

        backend.set_reachable(false);
        assert_eq!(store.get("k").await, None);
    }

    #[tokio::test]
    async fn test_clear_disconnected_keeps_primary() {
        let (backend, store) = make_store();
        store.set("kept", "v", Duration::from_secs(60)).await;

        backend.set_reachable(false);
        store.set("local", "v", Duration::from_secs(60)).await;
        store.clear().await;
        assert!(store.fallback().is_empty());

        backend.set_reachable(true);
        assert_eq!(store.get("kept").await, Some("v".into()));

        store.clear().await;
        assert_eq!(store.get("kept").await, None);
    }

    #[tokio::test]
    async fn test_get_list() {
        let (_backend, store) = make_store();
        let items = vec!["cars".to_string(), "pets".to_string()];
        store.set(&hashed_key("7"), items.clone(), Duration::from_secs(60)).await;

        let cached = store.get_list("i:7").await;
        assert_eq!(cached.id, "7");
        assert_eq!(cached.items, items);

        let missing = store.get_list("i:8").await;
        assert_eq!(missing.id, "8");
        assert!(missing.items.is_empty());
    }

    #[tokio::test]
    async fn test_set_list_appends_when_connected() {
        let (_backend, store) = make_store();
        let key = hashed_key("1");
        store.set(&key, vec!["cars".to_string()], Duration::from_secs(60)).await;
        store.set(&key, vec!["pets".to_string()], Duration::from_secs(60)).await;

        assert_eq!(
            store.get_list("i:1").await.items,
            vec!["cars".to_string(), "pets".to_string()]
        );
    }

    #[tokio::test]
    async fn test_concurrent_fallback_access() {
        let (backend, store) = make_store();
        backend.set_reachable(false);
        let store = Arc::new(store);

        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    let key = format!("k{i}");
                    store.set(&key, i.to_string(), Duration::from_secs(60)).await;
                    store.get(&key).await
                })
            })
            .collect();

        for (i, task) in tasks.into_iter().enumerate() {
            assert_eq!(task.await.unwrap(), Some(i.to_string()));
        }
        assert_eq!(store.fallback().len(), 32);
        assert_eq!(store.last_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_get_list_disconnected() {
        let (backend, store) = make_store();
        backend.set_reachable(false);

        assert!(store.get_list("i:1").await.items.is_empty());

        store
            .set(&hashed_key("1"), vec!["books".to_string()], Duration::from_secs(60))
            .await;
        assert_eq!(store.get_list("i:1").await.items, vec!["books".to_string()]);
    }

    #[test]
    fn test_identifier() {
        assert_eq!(identifier("i:42"), "42");
        assert_eq!(identifier("42"), "42");
        assert_eq!(identifier("a:b:c"), "b:c");
        assert_eq!(hashed_key("42"), hashed_key("42"));
        assert_ne!(hashed_key("42"), hashed_key("43"));
        assert!(hashed_key("42").starts_with("uid:"));
    }
}
