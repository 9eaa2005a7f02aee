//! Store backend implementations.
//!
//! This module provides concrete implementations of the store traits
//! defined in `relcache_core::cache`.
//!
//! # Feature Flags
//!
//! - `redis` (default): Redis store using the redis crate
//!
//! The in-memory store is always compiled in.

pub mod memory;

#[cfg(feature = "redis")]
pub mod redis_impl;

pub use memory::MemoryStore;

#[cfg(feature = "redis")]
pub use redis_impl::RedisStore;
