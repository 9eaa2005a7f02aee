//! In-memory store with LRU eviction and lazy TTL expiry.
//!
//! Values are kept exactly as written; relevance metadata is encoded by the
//! caller. `SCAN` orders keys by a fixed hash and the cursor is the next hash
//! to visit, so a key present for the whole scan is returned at least once
//! even when other keys are written or removed between pages.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::RwLock;

use relcache_core::cache::{pattern_matches, CacheError, HashStore, Result, Store};

const WRONG_TYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

#[derive(Debug, Clone)]
enum Value {
    Bytes(Vec<u8>),
    Hash(HashMap<String, Vec<u8>>),
}

/// A single store entry with optional expiration.
#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: Value, ttl: Option<Duration>) -> Self {
        let expires_at = ttl.map(|d| Instant::now() + d);
        Self { value, expires_at }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() > exp)
    }
}

type Keyspace = LruCache<String, Entry>;

/// Returns the live entry at `key`, dropping it first if it has expired.
fn live<'a>(store: &'a mut Keyspace, key: &str) -> Option<&'a mut Entry> {
    if store.peek(key).is_some_and(Entry::is_expired) {
        store.pop(key);
        return None;
    }
    store.get_mut(key)
}

/// In-memory store implementation with LRU eviction.
///
/// Thread-safe through `Arc<RwLock<LruCache>>`; clones share the keyspace.
/// The least recently used key is evicted once `max_entries` is reached.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    store: Arc<RwLock<Keyspace>>,
}

impl MemoryStore {
    /// Creates a new in-memory store.
    ///
    /// # Panics
    ///
    /// Panics if `max_entries` is 0.
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).expect("max_entries must be > 0");
        Self {
            store: Arc::new(RwLock::new(LruCache::new(capacity))),
        }
    }

    /// Sorted snapshot of every live key matching `pattern`.
    async fn matching_keys(&self, pattern: &str) -> Vec<String> {
        let store = self.store.read().await;
        let mut keys: Vec<String> = store
            .iter()
            .filter(|(key, entry)| !entry.is_expired() && pattern_matches(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Live keys whose scan slot is at least `cursor`, ordered by slot.
    async fn keys_from_slot(&self, cursor: u64) -> Vec<(u64, String)> {
        let store = self.store.read().await;
        let mut keys: Vec<(u64, String)> = store
            .iter()
            .filter(|(_, entry)| !entry.is_expired())
            .map(|(key, _)| (scan_slot(key), key.clone()))
            .filter(|(slot, _)| *slot >= cursor)
            .collect();
        keys.sort_unstable();
        keys
    }

    async fn remove(&self, keys: &[String]) -> u64 {
        let mut store = self.store.write().await;
        let mut removed = 0;
        for key in keys {
            if let Some(entry) = store.pop(key.as_str()) {
                if !entry.is_expired() {
                    removed += 1;
                }
            }
        }
        removed
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<String> {
        Ok("PONG".to_string())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut store = self.store.write().await;
        match live(&mut store, key) {
            Some(Entry {
                value: Value::Bytes(bytes),
                ..
            }) => Ok(Some(bytes.clone())),
            Some(_) => Err(CacheError::StoreCommand(WRONG_TYPE.to_string())),
            None => Ok(None),
        }
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        let mut store = self.store.write().await;
        let values = keys
            .iter()
            .map(|key| match live(&mut store, key) {
                Some(Entry {
                    value: Value::Bytes(bytes),
                    ..
                }) => Some(bytes.clone()),
                _ => None,
            })
            .collect();
        Ok(values)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let mut store = self.store.write().await;
        store.put(key.to_string(), Entry::new(Value::Bytes(value.to_vec()), ttl));
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut store = self.store.write().await;
        let Some(entry) = live(&mut store, key) else {
            store.put(key.to_string(), Entry::new(Value::Bytes(b"1".to_vec()), None));
            return Ok(1);
        };

        let Value::Bytes(bytes) = &mut entry.value else {
            return Err(CacheError::StoreCommand(WRONG_TYPE.to_string()));
        };
        let next = std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .and_then(|n| n.checked_add(1))
            .ok_or_else(|| {
                CacheError::StoreCommand("ERR value is not an integer or out of range".to_string())
            })?;
        *bytes = next.to_string().into_bytes();
        Ok(next)
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        Ok(self.remove(keys).await)
    }

    async fn unlink(&self, keys: &[String]) -> Result<u64> {
        Ok(self.remove(keys).await)
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<(u64, Vec<String>)> {
        let remaining = self.keys_from_slot(cursor).await;

        // A page never splits keys that share a slot.
        let mut end = count.max(1).min(remaining.len());
        while end < remaining.len() && remaining[end].0 == remaining[end - 1].0 {
            end += 1;
        }

        let next = match remaining[..end].last() {
            Some((slot, _)) if end < remaining.len() => slot + 1,
            _ => 0,
        };
        let page = remaining
            .into_iter()
            .take(end)
            .map(|(_, key)| key)
            .filter(|key| pattern_matches(pattern, key))
            .collect();
        Ok((next, page))
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        Ok(self.matching_keys(pattern).await)
    }

    async fn flush(&self) -> Result<()> {
        self.store.write().await.clear();
        Ok(())
    }
}

fn scan_slot(key: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

#[async_trait]
impl HashStore for MemoryStore {
    async fn hset(&self, key: &str, field: &str, value: &[u8]) -> Result<()> {
        let mut store = self.store.write().await;
        match live(&mut store, key) {
            Some(Entry {
                value: Value::Hash(fields),
                ..
            }) => {
                fields.insert(field.to_string(), value.to_vec());
            }
            Some(_) => return Err(CacheError::StoreCommand(WRONG_TYPE.to_string())),
            None => {
                let fields = HashMap::from([(field.to_string(), value.to_vec())]);
                store.put(key.to_string(), Entry::new(Value::Hash(fields), None));
            }
        }
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>> {
        let mut store = self.store.write().await;
        match live(&mut store, key) {
            Some(Entry {
                value: Value::Hash(fields),
                ..
            }) => Ok(fields.get(field).cloned()),
            Some(_) => Err(CacheError::StoreCommand(WRONG_TYPE.to_string())),
            None => Ok(None),
        }
    }

    async fn hlen(&self, key: &str) -> Result<u64> {
        let mut store = self.store.write().await;
        match live(&mut store, key) {
            Some(Entry {
                value: Value::Hash(fields),
                ..
            }) => Ok(fields.len() as u64),
            Some(_) => Err(CacheError::StoreCommand(WRONG_TYPE.to_string())),
            None => Ok(0),
        }
    }
}
