//! Cache key types and the key resolver.
//!
//! Callers address the cache through [`KeyRef`], which is classified once at
//! the boundary into a literal key, a pattern key or a reference to an
//! [`Item`]. Operations then turn it into the [`CacheKey`] (or literal key
//! string) they need.

use std::fmt;
use std::time::Duration;

use super::patterns::is_pattern;
use super::{CacheError, Result};

/// A key in the store's keyspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A single entry.
    Literal(String),
    /// A glob expression resolved against the keyspace at resolution time.
    Pattern(String),
}

impl CacheKey {
    /// Classifies `key` as a literal or a pattern key.
    pub fn parse(key: impl Into<String>) -> Self {
        let key = key.into();
        if is_pattern(&key) {
            Self::Pattern(key)
        } else {
            Self::Literal(key)
        }
    }

    /// Returns the raw key string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(key) | Self::Pattern(key) => key,
        }
    }

    pub fn is_pattern(&self) -> bool {
        matches!(self, Self::Pattern(_))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A logical cache entry that knows which other keys it is relevant to.
///
/// Deleting any key through a cascading delete also deletes every key that
/// entry lists in its relevant keys, transitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    key: String,
    payload: Vec<u8>,
    ttl: Duration,
    relevant_keys: Vec<String>,
}

impl Item {
    /// Creates an item with no expiration and no relevant keys.
    pub fn new(key: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            payload: payload.into(),
            ttl: Duration::ZERO,
            relevant_keys: Vec::new(),
        }
    }

    /// Sets the time-to-live. A zero duration means no expiration.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Appends a key that must be deleted together with this item.
    pub fn with_relevant_key(mut self, key: impl Into<String>) -> Self {
        self.relevant_keys.push(key.into());
        self
    }

    /// Appends several relevant keys, preserving their order.
    pub fn with_relevant_keys<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.relevant_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns the expiration, or `None` when the item never expires.
    pub fn ttl(&self) -> Option<Duration> {
        (!self.ttl.is_zero()).then_some(self.ttl)
    }

    pub fn relevant_keys(&self) -> &[String] {
        &self.relevant_keys
    }
}

/// A caller-supplied key argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRef<'a> {
    Literal(&'a str),
    Pattern(&'a str),
    Item(&'a Item),
}

impl<'a> KeyRef<'a> {
    /// Resolves the argument into the key a cascading operation starts from.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidKeyType` for an empty key or for an item
    /// whose own key is a pattern.
    pub fn to_cache_key(&self) -> Result<CacheKey> {
        match *self {
            Self::Literal(key) => Ok(CacheKey::Literal(non_empty(key)?.to_string())),
            Self::Pattern(pattern) => Ok(CacheKey::Pattern(non_empty(pattern)?.to_string())),
            Self::Item(item) => item_key(item).map(|key| CacheKey::Literal(key.to_string())),
        }
    }

    /// Resolves the argument into a single literal key.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidKeyType` for pattern keys, empty keys and
    /// items whose key is a pattern.
    pub fn literal(&self) -> Result<&'a str> {
        match *self {
            Self::Literal(key) => non_empty(key),
            Self::Pattern(pattern) => Err(CacheError::InvalidKeyType(format!(
                "pattern key {pattern:?} cannot address a single entry"
            ))),
            Self::Item(item) => item_key(item),
        }
    }
}

impl<'a> From<&'a str> for KeyRef<'a> {
    fn from(key: &'a str) -> Self {
        if is_pattern(key) {
            Self::Pattern(key)
        } else {
            Self::Literal(key)
        }
    }
}

impl<'a> From<&'a String> for KeyRef<'a> {
    fn from(key: &'a String) -> Self {
        Self::from(key.as_str())
    }
}

impl<'a> From<&'a Item> for KeyRef<'a> {
    fn from(item: &'a Item) -> Self {
        Self::Item(item)
    }
}

impl<'a> From<&'a CacheKey> for KeyRef<'a> {
    fn from(key: &'a CacheKey) -> Self {
        match key {
            CacheKey::Literal(key) => Self::Literal(key),
            CacheKey::Pattern(pattern) => Self::Pattern(pattern),
        }
    }
}

fn non_empty(key: &str) -> Result<&str> {
    if key.is_empty() {
        return Err(CacheError::InvalidKeyType("empty key".to_string()));
    }
    Ok(key)
}

fn item_key(item: &Item) -> Result<&str> {
    let key = non_empty(item.key())?;
    if is_pattern(key) {
        return Err(CacheError::InvalidKeyType(format!(
            "item key {key:?} must be a literal key"
        )));
    }
    Ok(key)
}
