//! In-process primary backend. Used when no Redis is configured and by tests,
//! which toggle reachability to drive the store into degraded mode.
use crate::backend::{BackendError, CacheValue, PrimaryBackend};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

struct Entry {
    value: CacheValue,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

fn expiry(ttl: Option<Duration>) -> Option<Instant> {
    ttl.filter(|ttl| !ttl.is_zero()).map(|ttl| Instant::now() + ttl)
}

pub struct MemoryBackend {
    data: Mutex<HashMap<String, Entry>>,
    reachable: AtomicBool,
    pings: AtomicUsize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend {
            data: Mutex::new(HashMap::new()),
            reachable: AtomicBool::new(true),
            pings: AtomicUsize::new(0),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Number of liveness probes received, reachable or not.
    pub fn ping_count(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    /// Direct view of the live data, bypassing reachability.
    pub fn snapshot(&self, key: &str) -> Option<CacheValue> {
        let mut data = self.data.lock();
        live(&mut data, key).map(|entry| entry.value.clone())
    }

    fn check(&self) -> Result<(), BackendError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BackendError::Unavailable("memory backend marked unreachable".into()))
        }
    }
}

/// The entry under `key`, dropping it first if it has expired.
fn live<'a>(data: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
    if data.get(key).is_some_and(|entry| entry.is_expired(Instant::now())) {
        data.remove(key);
    }
    data.get_mut(key)
}

fn wrong_type(key: &str) -> BackendError {
    BackendError::Unavailable(format!("wrong type for key {key}"))
}

#[async_trait]
impl PrimaryBackend for MemoryBackend {
    async fn ping(&self) -> Result<(), BackendError> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        self.check()
    }

    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        self.check()?;
        let mut data = self.data.lock();
        match live(&mut data, key).map(|entry| &entry.value) {
            Some(CacheValue::Scalar(value)) => Ok(Some(value.clone())),
            Some(CacheValue::List(_)) => Err(wrong_type(key)),
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), BackendError> {
        self.check()?;
        self.data.lock().insert(
            key.to_string(),
            Entry {
                value: CacheValue::Scalar(value.to_string()),
                expires_at: expiry(ttl),
            },
        );
        Ok(())
    }

    async fn set_list(
        &self,
        key: &str,
        values: &[String],
        ttl: Option<Duration>,
    ) -> Result<(), BackendError> {
        self.check()?;
        let mut data = self.data.lock();
        match live(&mut data, key) {
            Some(Entry {
                value: CacheValue::List(list),
                expires_at,
            }) => {
                list.extend_from_slice(values);
                if let Some(at) = expiry(ttl) {
                    *expires_at = Some(at);
                }
            }
            Some(_) => return Err(wrong_type(key)),
            None if values.is_empty() => {}
            None => {
                data.insert(
                    key.to_string(),
                    Entry {
                        value: CacheValue::List(values.to_vec()),
                        expires_at: expiry(ttl),
                    },
                );
            }
        }
        Ok(())
    }

    async fn lrange(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, BackendError> {
        self.check()?;
        let mut data = self.data.lock();
        let list = match live(&mut data, key).map(|entry| &entry.value) {
            Some(CacheValue::List(list)) => list,
            Some(CacheValue::Scalar(_)) => return Err(wrong_type(key)),
            None => return Ok(Vec::new()),
        };

        let len = list.len() as isize;
        let resolve = |idx: isize| if idx < 0 { len + idx } else { idx };
        let start = resolve(start).max(0);
        let stop = resolve(stop).min(len - 1);
        if start > stop {
            return Ok(Vec::new());
        }
        Ok(list[start as usize..=stop as usize].to_vec())
    }

    async fn flush_all(&self) -> Result<(), BackendError> {
        self.check()?;
        self.data.lock().clear();
        Ok(())
    }
}
