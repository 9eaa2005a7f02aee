//! In-test store that records every command it receives.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{pattern_matches, CacheError, Result, Store};

#[derive(Debug, Default)]
pub(crate) struct RecordingStore {
    values: Mutex<BTreeMap<String, Vec<u8>>>,
    commands: Mutex<Vec<String>>,
    failing: Mutex<Vec<String>>,
    unreadable: Mutex<Vec<String>>,
    reject_deletes: AtomicBool,
}

impl RecordingStore {
    pub(crate) fn with(self, key: &str, value: &[u8]) -> Self {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        self
    }

    /// Makes GET and DEL/UNLINK fail for `key`, and SCAN fail for it as a pattern.
    pub(crate) fn failing_on(self, key: &str) -> Self {
        self.failing.lock().unwrap().push(key.to_string());
        self
    }

    /// Makes only GET fail for `key`, as for a key holding another type.
    pub(crate) fn unreadable(self, key: &str) -> Self {
        self.unreadable.lock().unwrap().push(key.to_string());
        self
    }

    /// Makes every DEL/UNLINK fail.
    pub(crate) fn rejecting_deletes(self) -> Self {
        self.reject_deletes.store(true, Ordering::SeqCst);
        self
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.values.lock().unwrap().contains_key(key)
    }

    fn record(&self, command: String) {
        self.commands.lock().unwrap().push(command);
    }

    fn check(&self, key: &str) -> Result<()> {
        if self.failing.lock().unwrap().iter().any(|k| k == key) {
            return Err(CacheError::StoreCommand(format!("injected failure on {key}")));
        }
        Ok(())
    }

    fn remove(&self, keys: &[String]) -> Result<u64> {
        if self.reject_deletes.load(Ordering::SeqCst) {
            return Err(CacheError::StoreCommand("deletes rejected".to_string()));
        }
        for key in keys {
            self.check(key)?;
        }
        let mut values = self.values.lock().unwrap();
        Ok(keys.iter().filter(|k| values.remove(*k).is_some()).count() as u64)
    }
}

#[async_trait]
impl Store for RecordingStore {
    async fn ping(&self) -> Result<String> {
        self.record("PING".to_string());
        Ok("PONG".to_string())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.record(format!("GET {key}"));
        self.check(key)?;
        if self.unreadable.lock().unwrap().iter().any(|k| k == key) {
            return Err(CacheError::StoreCommand(format!("WRONGTYPE {key}")));
        }
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        self.record(format!("MGET {}", keys.join(" ")));
        let values = self.values.lock().unwrap();
        Ok(keys.iter().map(|k| values.get(k).cloned()).collect())
    }

    async fn set(&self, key: &str, value: &[u8], _ttl: Option<Duration>) -> Result<()> {
        self.record(format!("SET {key}"));
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        self.record(format!("INCR {key}"));
        Err(CacheError::StoreCommand("INCR unsupported".to_string()))
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        self.record(format!("DEL {}", keys.join(" ")));
        self.remove(keys)
    }

    async fn unlink(&self, keys: &[String]) -> Result<u64> {
        self.record(format!("UNLINK {}", keys.join(" ")));
        self.remove(keys)
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<(u64, Vec<String>)> {
        self.record(format!("SCAN {cursor} {pattern} {count}"));
        self.check(pattern)?;
        let values = self.values.lock().unwrap();
        let start = (cursor as usize).min(values.len());
        let end = (start + count).min(values.len());
        let page = values
            .keys()
            .skip(start)
            .take(end - start)
            .filter(|k| pattern_matches(pattern, k))
            .cloned()
            .collect();
        let next = if end >= values.len() { 0 } else { end as u64 };
        Ok((next, page))
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.record(format!("KEYS {pattern}"));
        let values = self.values.lock().unwrap();
        Ok(values
            .keys()
            .filter(|k| pattern_matches(pattern, k))
            .cloned()
            .collect())
    }

    async fn flush(&self) -> Result<()> {
        self.record("FLUSHDB ASYNC".to_string());
        self.values.lock().unwrap().clear();
        Ok(())
    }
}
