//! Redis store backend.
//!
//! A thin proxy over a Redis-compatible server through a multiplexed
//! connection manager. Supports plaintext and TLS endpoints.

mod error;
mod store;

pub use store::RedisStore;
