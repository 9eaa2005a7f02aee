//! relcache - a cache client with dependency-aware cascading invalidation.
//!
//! Items written through [`RelevantCache::write_item`] declare which other
//! keys they are relevant to. Deleting a key with [`RelevantCache::del`] or
//! [`RelevantCache::unlink`] removes every key reachable through those
//! declarations, including pattern keys such as `"user:*"`.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use relcache::store::MemoryStore;
//! use relcache::{Item, KeyRef, RelevantCache, ResolverConfig};
//!
//! # async fn example() -> relcache::Result<()> {
//! let cache = RelevantCache::new(Arc::new(MemoryStore::new(1_000)), ResolverConfig::default());
//! cache.write_item(&Item::new("A", "v1").with_relevant_key("B")).await?;
//! cache.write_item(&Item::new("B", "v2")).await?;
//!
//! cache.del(&[KeyRef::from("A")]).await?;
//! assert!(cache.get("B").await.is_err());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod store;

mod client;

pub use client::RelevantCache;
pub use config::Config;
pub use relcache_core::cache::{
    CacheError, CacheKey, DeleteMode, FullStore, HashStore, Item, KeyRef, ResolverConfig, Result,
    Store,
};
