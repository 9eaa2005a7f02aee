//! In-memory store backend.
//!
//! Speaks the same command set as the Redis backend for single-process use
//! and tests.

mod store;

pub use store::MemoryStore;
