//! Cache façade with cascading invalidation.
//!
//! Writes of [`Item`]s embed the item's relevant keys in the stored value;
//! deletes follow those keys and remove everything reachable in one bulk
//! command. Plain writes and the hash/counter commands pass straight through.

use std::sync::Arc;
use std::time::Duration;

use relcache_core::cache::{
    cascade_delete, decode_payload, encode, resolve_relevant_keys, CacheError, DeleteMode,
    FullStore, Item, KeyRef, ResolverConfig, Result,
};

use crate::config::Config;
use crate::store::MemoryStore;
#[cfg(feature = "redis")]
use crate::store::RedisStore;

/// Cache client over a shared store connection.
///
/// # Type Parameters
///
/// * `S` - The store implementation
pub struct RelevantCache<S: ?Sized> {
    store: Arc<S>,
    resolver: ResolverConfig,
}

impl<S: ?Sized> Clone for RelevantCache<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            resolver: self.resolver,
        }
    }
}

#[cfg(feature = "redis")]
impl RelevantCache<RedisStore> {
    /// Connects to the configured Redis endpoint.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::ConnectionFailed` if the endpoint is invalid, the
    /// connection cannot be established or the server does not answer `PONG`.
    pub async fn connect(config: &Config) -> Result<Self> {
        let url = config.connection_url()?;
        let store = RedisStore::new(&url).await?;
        Self::open(Arc::new(store), config.resolver_config()).await
    }
}

impl RelevantCache<MemoryStore> {
    /// Creates a cache over a fresh in-process store.
    pub fn in_memory(config: &Config) -> Self {
        let store = MemoryStore::new(config.memory_max_entries.max(1));
        Self::new(Arc::new(store), config.resolver_config())
    }
}

impl<S: FullStore + ?Sized> RelevantCache<S> {
    /// Wraps a store without checking its liveness.
    pub fn new(store: Arc<S>, resolver: ResolverConfig) -> Self {
        Self { store, resolver }
    }

    /// Wraps a store after a successful liveness check.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::ConnectionFailed` if `PING` fails or answers
    /// anything but `PONG`.
    pub async fn open(store: Arc<S>, resolver: ResolverConfig) -> Result<Self> {
        let pong = store.ping().await.map_err(|err| match err {
            CacheError::StoreCommand(msg) => CacheError::ConnectionFailed(msg),
            other => other,
        })?;
        if pong != "PONG" {
            return Err(CacheError::ConnectionFailed(format!(
                "failed to receive PONG from server, got {pong:?}"
            )));
        }
        tracing::debug!("Store connection is alive");
        Ok(Self::new(store, resolver))
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        self.resolver
    }

    /// Writes an item together with its relevant keys.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidKeyType` if the item key is empty or a
    /// pattern, or `CacheError::StoreCommand` if the write fails.
    pub async fn write_item(&self, item: &Item) -> Result<()> {
        let key = KeyRef::from(item).literal()?;
        let value = encode(item.payload(), item.relevant_keys());
        tracing::debug!(%key, relevant_keys = ?item.relevant_keys(), "Writing cache item");
        self.store.set(key, &value, item.ttl()).await
    }

    /// Writes a raw value that carries no relevance metadata and never expires.
    pub async fn write_raw(&self, key: &str, value: &[u8]) -> Result<()> {
        self.write_raw_with_ttl(key, value, Duration::ZERO).await
    }

    /// Writes a raw value that carries no relevance metadata.
    ///
    /// A zero `ttl` means no expiration.
    pub async fn write_raw_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let key = KeyRef::from(key).literal()?;
        let ttl = (!ttl.is_zero()).then_some(ttl);
        self.store.set(key, value, ttl).await
    }

    /// Reads the payload stored at a key.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::NotFound` if the key does not exist and
    /// `CacheError::InvalidKeyType` for pattern keys.
    pub async fn get<'k>(&self, key: impl Into<KeyRef<'k>>) -> Result<Vec<u8>> {
        let key = key.into().literal()?;
        match self.store.get(key).await? {
            Some(bytes) => Ok(decode_payload(&bytes)),
            None => Err(CacheError::NotFound(key.to_string())),
        }
    }

    /// Reads the payloads of several keys in input order; misses are `None`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidKeyType` if any key is not a literal key.
    pub async fn mget(&self, keys: &[KeyRef<'_>]) -> Result<Vec<Option<Vec<u8>>>> {
        let keys = keys
            .iter()
            .map(|key| key.literal().map(str::to_string))
            .collect::<Result<Vec<_>>>()?;

        let values = self.store.mget(&keys).await?;
        Ok(values
            .into_iter()
            .map(|value| value.map(|bytes| decode_payload(&bytes)))
            .collect())
    }

    /// Lists the keys a cascading delete of `key` would remove.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidKeyType` if `key` is empty.
    pub async fn relevance<'k>(&self, key: impl Into<KeyRef<'k>>) -> Result<Vec<String>> {
        let root = key.into().to_cache_key()?;
        Ok(resolve_relevant_keys(self.store.as_ref(), &root, self.resolver).await)
    }

    /// Deletes keys and everything relevant to them with `DEL`.
    ///
    /// Returns the number of keys removed.
    pub async fn del(&self, keys: &[KeyRef<'_>]) -> Result<u64> {
        cascade_delete(self.store.as_ref(), DeleteMode::Delete, keys, self.resolver).await
    }

    /// Deletes keys and everything relevant to them with `UNLINK`.
    ///
    /// Requires a store that supports `UNLINK` (Redis 4 or later).
    pub async fn unlink(&self, keys: &[KeyRef<'_>]) -> Result<u64> {
        cascade_delete(self.store.as_ref(), DeleteMode::Unlink, keys, self.resolver).await
    }

    /// Increments the counter stored at `key`.
    pub async fn increment<'k>(&self, key: impl Into<KeyRef<'k>>) -> Result<i64> {
        let key = key.into().literal()?;
        self.store.incr(key).await
    }

    pub async fn hset<'k>(
        &self,
        key: impl Into<KeyRef<'k>>,
        field: &str,
        value: &[u8],
    ) -> Result<()> {
        let key = key.into().literal()?;
        self.store.hset(key, field, value).await
    }

    /// Reads a hash field.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::NotFound` if the hash or the field does not exist.
    pub async fn hget<'k>(&self, key: impl Into<KeyRef<'k>>, field: &str) -> Result<Vec<u8>> {
        let key = key.into().literal()?;
        self.store
            .hget(key, field)
            .await?
            .ok_or_else(|| CacheError::NotFound(format!("{key} field {field}")))
    }

    pub async fn hlen<'k>(&self, key: impl Into<KeyRef<'k>>) -> Result<u64> {
        let key = key.into().literal()?;
        self.store.hlen(key).await
    }

    /// Removes every key from the current database.
    pub async fn purge(&self) -> Result<()> {
        tracing::info!("Purging all cache keys");
        self.store.flush().await
    }

    /// Lists every key in the store, sorted.
    pub async fn dump(&self) -> Result<Vec<String>> {
        let mut keys = self.store.keys("*").await?;
        keys.sort();
        Ok(keys)
    }
}
