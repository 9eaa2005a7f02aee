//! Relevance resolution.
//!
//! Every stored value carries the list of keys it is relevant to. Following
//! those lists from a root key reconstructs the part of the relevance graph
//! reachable from it; a cascading delete removes all of it.
//!
//! Resolution walks the graph depth-first with one store round trip per
//! visited node. Pattern keys are expanded with incremental `SCAN` pages.
//! The graph is not trusted to be acyclic: every key is expanded at most once
//! per resolution and the walk stops at a configurable depth.

use std::collections::{HashMap, HashSet};

use super::codec::decode;
use super::{CacheKey, Store};

/// Keys requested per `SCAN` round trip.
pub const DEFAULT_SCAN_PAGE_SIZE: usize = 1000;

/// Deepest relevance chain followed from a root key.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Tuning knobs for relevance resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    pub scan_page_size: usize,
    pub max_depth: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            scan_page_size: DEFAULT_SCAN_PAGE_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Resolves the full set of literal keys reachable from a root key.
pub struct Resolver<'s, S: Store + ?Sized> {
    store: &'s S,
    config: ResolverConfig,
}

impl<'s, S: Store + ?Sized> Resolver<'s, S> {
    pub fn new(store: &'s S, config: ResolverConfig) -> Self {
        Self { store, config }
    }

    /// Returns every literal key reachable from `root`, root first.
    ///
    /// Keys appear in depth-first order and at most once. A literal root that
    /// is absent from the store yields an empty list.
    ///
    /// Store failures never abort the walk: a key whose `GET` fails is kept
    /// as a leaf and a pattern whose `SCAN` fails matches nothing.
    pub async fn resolve(&self, root: &CacheKey) -> Vec<String> {
        let mut resolved = Vec::new();
        let mut emitted: HashSet<String> = HashSet::new();
        // Shallowest depth each key has been expanded at.
        let mut expanded: HashMap<CacheKey, usize> = HashMap::new();
        // Keys on the path from the root to the node being expanded.
        let mut path: Vec<CacheKey> = Vec::new();
        let mut stack = vec![(root.clone(), 0usize)];

        while let Some((key, depth)) = stack.pop() {
            path.truncate(depth);

            if depth > self.config.max_depth {
                tracing::warn!(
                    %key,
                    parent = %path.last().map(CacheKey::as_str).unwrap_or_default(),
                    max_depth = self.config.max_depth,
                    "Relevance chain too deep, not expanding"
                );
                continue;
            }
            if path.contains(&key) {
                tracing::warn!(
                    %key,
                    cycle = ?path.iter().map(CacheKey::as_str).collect::<Vec<_>>(),
                    "Relevance cycle detected"
                );
                continue;
            }
            // A shallower visit has more depth budget left for the subtree.
            if expanded.get(&key).is_some_and(|&previous| previous <= depth) {
                tracing::trace!(%key, "Key already resolved");
                continue;
            }
            expanded.insert(key.clone(), depth);

            let children = match &key {
                CacheKey::Literal(literal) => {
                    let Some(relevant) = self.read_relevant(literal).await else {
                        continue;
                    };
                    if emitted.insert(literal.clone()) {
                        resolved.push(literal.clone());
                    }
                    relevant
                }
                CacheKey::Pattern(pattern) => self
                    .scan_all(pattern)
                    .await
                    .into_iter()
                    .map(CacheKey::Literal)
                    .collect(),
            };

            path.push(key);
            // Reverse so the first child is expanded first.
            stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
        }

        tracing::debug!(root = %root, keys = ?resolved, "Resolved relevant keys");
        resolved
    }

    /// Reads the relevant keys stored at `key`, or `None` if it is absent.
    ///
    /// A failed read (e.g. the key holds a hash) yields no relevant keys, so
    /// the key itself is still deleted.
    async fn read_relevant(&self, key: &str) -> Option<Vec<CacheKey>> {
        let bytes = match self.store.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::debug!(%key, "Key not found while resolving relevance, skipping");
                return None;
            }
            Err(err) => {
                tracing::warn!(%key, error = %err, "Failed to read key, not expanding its relevant keys");
                return Some(Vec::new());
            }
        };

        let relevant = decode(&bytes)
            .relevant_keys
            .into_iter()
            .map(CacheKey::parse)
            .collect();
        Some(relevant)
    }

    /// Collects every key matching `pattern` with cursor-based scanning.
    ///
    /// A failed `SCAN` round trip ends the scan with the keys gathered so far.
    async fn scan_all(&self, pattern: &str) -> Vec<String> {
        let mut matched = Vec::new();
        let mut cursor = 0;
        loop {
            let (next, page) = match self
                .store
                .scan(cursor, pattern, self.config.scan_page_size)
                .await
            {
                Ok(step) => step,
                Err(err) => {
                    tracing::warn!(%pattern, cursor, error = %err, "Failed to scan pattern key");
                    break;
                }
            };
            matched.extend(page);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        tracing::debug!(%pattern, matched = matched.len(), "Scanned pattern key");
        matched
    }
}

/// Resolves `root` with the given configuration.
pub async fn resolve_relevant_keys<S: Store + ?Sized>(
    store: &S,
    root: &CacheKey,
    config: ResolverConfig,
) -> Vec<String> {
    Resolver::new(store, config).resolve(root).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::codec::encode;
    use crate::cache::testing::RecordingStore;

    fn framed(payload: &str, keys: &[&str]) -> Vec<u8> {
        encode(payload.as_bytes(), keys)
    }

    async fn resolve(store: &RecordingStore, key: &str) -> Vec<String> {
        resolve_relevant_keys(store, &CacheKey::parse(key), ResolverConfig::default()).await
    }

    #[tokio::test]
    async fn test_key_without_relevant_keys_resolves_to_itself() {
        let store = RecordingStore::default().with("A", &framed("v", &[]));
        assert_eq!(resolve(&store, "A").await, vec!["A"]);
    }

    #[tokio::test]
    async fn test_legacy_value_resolves_to_itself() {
        let store = RecordingStore::default().with("A", b"written without relevance");
        assert_eq!(resolve(&store, "A").await, vec!["A"]);
    }

    #[tokio::test]
    async fn test_transitive_closure() {
        let store = RecordingStore::default()
            .with("A", &framed("a", &["B"]))
            .with("B", &framed("b", &["C"]))
            .with("C", &framed("c", &[]));

        assert_eq!(resolve(&store, "A").await, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_depth_first_order() {
        let store = RecordingStore::default()
            .with("A", &framed("a", &["B", "D"]))
            .with("B", &framed("b", &["C"]))
            .with("C", &framed("c", &[]))
            .with("D", &framed("d", &[]));

        assert_eq!(resolve(&store, "A").await, vec!["A", "B", "C", "D"]);
    }

    #[tokio::test]
    async fn test_missing_key_resolves_to_nothing() {
        let store = RecordingStore::default();
        assert!(resolve(&store, "missing").await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_dependent_is_skipped() {
        let store = RecordingStore::default()
            .with("A", &framed("a", &["expired", "B"]))
            .with("B", &framed("b", &[]));

        assert_eq!(resolve(&store, "A").await, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_pattern_expansion() {
        let store = RecordingStore::default()
            .with("user:1", &framed("u1", &[]))
            .with("user:2", &framed("u2", &["profile:2"]))
            .with("profile:2", &framed("p2", &[]))
            .with("other:1", &framed("o1", &[]));

        let keys = resolve(&store, "user:*").await;
        assert_eq!(keys, vec!["user:1", "user:2", "profile:2"]);
        assert!(!keys.contains(&"other:1".to_string()));
    }

    #[tokio::test]
    async fn test_pattern_scans_every_page() {
        let mut store = RecordingStore::default();
        for i in 0..5 {
            store = store.with(&format!("k:{i}"), &framed("v", &[]));
        }
        let config = ResolverConfig {
            scan_page_size: 2,
            ..ResolverConfig::default()
        };

        let keys = resolve_relevant_keys(&store, &CacheKey::parse("k:*"), config).await;

        assert_eq!(keys.len(), 5);
        let scans: Vec<_> = store
            .commands()
            .into_iter()
            .filter(|c| c.starts_with("SCAN"))
            .collect();
        assert_eq!(scans, vec!["SCAN 0 k:* 2", "SCAN 2 k:* 2", "SCAN 4 k:* 2"]);
    }

    #[tokio::test]
    async fn test_relevant_pattern_key() {
        let store = RecordingStore::default()
            .with("user:1", &framed("u1", &["session:1:*"]))
            .with("session:1:a", &framed("s", &[]))
            .with("session:1:b", &framed("s", &[]))
            .with("session:2:a", &framed("s", &[]));

        assert_eq!(
            resolve(&store, "user:1").await,
            vec!["user:1", "session:1:a", "session:1:b"]
        );
    }

    #[tokio::test]
    async fn test_cycle_terminates() {
        let store = RecordingStore::default()
            .with("A", &framed("a", &["B"]))
            .with("B", &framed("b", &["A"]));

        assert_eq!(resolve(&store, "A").await, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_self_reference_terminates() {
        let store = RecordingStore::default().with("A", &framed("a", &["A"]));
        assert_eq!(resolve(&store, "A").await, vec!["A"]);
    }

    #[tokio::test]
    async fn test_shared_dependent_is_read_once() {
        let store = RecordingStore::default()
            .with("A", &framed("a", &["B", "C"]))
            .with("B", &framed("b", &["D"]))
            .with("C", &framed("c", &["D"]))
            .with("D", &framed("d", &[]));

        assert_eq!(resolve(&store, "A").await, vec!["A", "B", "D", "C"]);
        let reads = store
            .commands()
            .into_iter()
            .filter(|c| c == "GET D")
            .count();
        assert_eq!(reads, 1);
    }

    #[tokio::test]
    async fn test_depth_limit_stops_expansion() {
        let store = RecordingStore::default()
            .with("A", &framed("a", &["B"]))
            .with("B", &framed("b", &["C"]))
            .with("C", &framed("c", &[]));
        let config = ResolverConfig {
            max_depth: 1,
            ..ResolverConfig::default()
        };

        let keys = resolve_relevant_keys(&store, &CacheKey::parse("A"), config).await;

        assert_eq!(keys, vec!["A", "B"]);
        assert!(!store.commands().contains(&"GET C".to_string()));
    }

    #[tokio::test]
    async fn test_shallower_path_expands_past_deep_cut() {
        let store = RecordingStore::default()
            .with("A", &framed("a", &["B", "C"]))
            .with("B", &framed("b", &["C"]))
            .with("C", &framed("c", &["D"]))
            .with("D", &framed("d", &[]));
        let config = ResolverConfig {
            max_depth: 2,
            ..ResolverConfig::default()
        };

        let keys = resolve_relevant_keys(&store, &CacheKey::parse("A"), config).await;

        assert_eq!(keys, vec!["A", "B", "C", "D"]);
    }

    #[tokio::test]
    async fn test_unreadable_dependent_is_kept_as_leaf() {
        let store = RecordingStore::default()
            .with("A", &framed("a", &["H", "B"]))
            .with("H", &framed("h", &["hidden"]))
            .with("hidden", &framed("x", &[]))
            .with("B", &framed("b", &[]))
            .failing_on("H");

        assert_eq!(resolve(&store, "A").await, vec!["A", "H", "B"]);
        assert!(!store.commands().contains(&"GET hidden".to_string()));
    }

    #[tokio::test]
    async fn test_failed_scan_matches_nothing() {
        let store = RecordingStore::default()
            .with("A", &framed("a", &["user:*", "B"]))
            .with("user:1", &framed("u", &[]))
            .with("B", &framed("b", &[]))
            .failing_on("user:*");

        assert_eq!(resolve(&store, "A").await, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_escaped_wildcard_is_read_as_literal() {
        let store = RecordingStore::default()
            .with(r"lit\*", &framed("l", &["B"]))
            .with("B", &framed("b", &[]));

        assert_eq!(resolve(&store, r"lit\*").await, vec![r"lit\*", "B"]);
        assert!(store.commands().iter().all(|command| !command.starts_with("SCAN")));
    }
}
