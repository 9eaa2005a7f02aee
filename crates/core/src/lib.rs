//! Core of relcache: a cache layer with dependency-aware cascading
//! invalidation in front of a Redis-compatible store.
//!
//! This crate holds the pure parts (keys, value codec, pattern matching, error
//! taxonomy) and the store-generic relevance resolution and cascade deletion.
//! Concrete stores live in the `relcache` crate.

pub mod cache;
