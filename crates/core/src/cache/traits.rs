use std::time::Duration;

use async_trait::async_trait;

use super::Result;

/// Key/value commands of the remote store.
///
/// Implementations are thin proxies: they do not encode or decode values.
#[async_trait]
pub trait Store: Send + Sync {
    /// Liveness check. A healthy store answers `"PONG"`.
    async fn ping(&self) -> Result<String>;

    /// Gets the raw value stored at `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Gets the raw values of several keys, in input order.
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>>;

    /// Sets a raw value with an optional TTL.
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()>;

    /// Increments the integer stored at `key`, returning the new value.
    async fn incr(&self, key: &str) -> Result<i64>;

    /// Removes keys synchronously, returning how many existed.
    async fn delete(&self, keys: &[String]) -> Result<u64>;

    /// Removes keys with non-blocking reclamation, returning how many existed.
    async fn unlink(&self, keys: &[String]) -> Result<u64>;

    /// Runs one incremental scan step over keys matching `pattern`.
    ///
    /// Returns the next cursor and a page of keys. A returned cursor of `0`
    /// means the iteration is complete.
    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<(u64, Vec<String>)>;

    /// Lists every key matching `pattern` in one call.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// Removes every key of the current database without blocking the store.
    async fn flush(&self) -> Result<()>;
}

/// Hash commands of the remote store.
#[async_trait]
pub trait HashStore: Send + Sync {
    async fn hset(&self, key: &str, field: &str, value: &[u8]) -> Result<()>;

    async fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>>;

    /// Returns the number of fields in the hash, `0` when it does not exist.
    async fn hlen(&self, key: &str) -> Result<u64>;
}

/// Combined trait for stores that support both key/value and hash commands.
pub trait FullStore: Store + HashStore {}

impl<T: Store + HashStore> FullStore for T {}
