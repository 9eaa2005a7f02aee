mod cascade;
mod codec;
mod error;
mod keys;
mod patterns;
mod relevance;
mod traits;

#[cfg(test)]
mod testing;

pub use cascade::{cascade_delete, collect_cascade_keys, DeleteMode};
pub use codec::{decode, decode_payload, encode, Envelope, MAGIC};
pub use error::{CacheError, Result};
pub use keys::{CacheKey, Item, KeyRef};
pub use patterns::{is_pattern, pattern_matches, WILDCARD};
pub use relevance::{
    resolve_relevant_keys, Resolver, ResolverConfig, DEFAULT_MAX_DEPTH, DEFAULT_SCAN_PAGE_SIZE,
};
pub use traits::{FullStore, HashStore, Store};
