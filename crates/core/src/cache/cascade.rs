//! Cascading deletion.
//!
//! Resolves the relevance set of every input key and removes the union with a
//! single bulk command. Inputs with an invalid key shape are skipped and logged.
//! Store read failures during resolution never drop an input.

use std::fmt;

use super::relevance::{Resolver, ResolverConfig};
use super::{KeyRef, Result, Store};

/// Terminal store command of a cascading delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// `UNLINK`: the store reclaims memory in the background.
    Unlink,
    /// `DEL`: synchronous removal.
    Delete,
}

impl fmt::Display for DeleteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlink => f.write_str("UNLINK"),
            Self::Delete => f.write_str("DEL"),
        }
    }
}

/// Collects the relevance sets of all inputs into one flat list.
///
/// Keys reachable from more than one input appear once per input.
pub async fn collect_cascade_keys<S: Store + ?Sized>(
    store: &S,
    mode: DeleteMode,
    inputs: &[KeyRef<'_>],
    config: ResolverConfig,
) -> Vec<String> {
    let resolver = Resolver::new(store, config);
    let mut keys = Vec::new();

    for input in inputs {
        let root = match input.to_cache_key() {
            Ok(root) => root,
            Err(err) => {
                tracing::warn!(command = %mode, input = ?input, error = %err, "Skipping invalid key");
                continue;
            }
        };

        let resolved = resolver.resolve(&root).await;
        tracing::debug!(command = %mode, %root, keys = ?resolved, "Collected relevant keys");
        keys.extend(resolved);
    }

    keys
}

/// Deletes every input key together with every key relevant to it.
///
/// Keys whose value cannot be read are still deleted, only their relevant
/// keys are not followed. Issues no store command when nothing resolves. Returns the number of keys
/// the store reported removed.
///
/// # Errors
///
/// Only a failure of the final bulk deletion is returned.
pub async fn cascade_delete<S: Store + ?Sized>(
    store: &S,
    mode: DeleteMode,
    inputs: &[KeyRef<'_>],
    config: ResolverConfig,
) -> Result<u64> {
    let keys = collect_cascade_keys(store, mode, inputs, config).await;
    if keys.is_empty() {
        tracing::debug!(command = %mode, "No relevant keys to delete, skipped");
        return Ok(0);
    }

    tracing::debug!(command = %mode, keys = ?keys, "Deleting relevant keys");
    let removed = match mode {
        DeleteMode::Unlink => store.unlink(&keys).await?,
        DeleteMode::Delete => store.delete(&keys).await?,
    };
    tracing::info!(command = %mode, requested = keys.len(), removed, "Cascading delete completed");
    Ok(removed)
}
