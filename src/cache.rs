//! Injected cache abstraction for cross-run memoization.
//!
//! The parsing/reconciliation core is pure; identical inputs always yield an
//! identical result. Callers may therefore memoize parsed [`DiffSet`]s keyed
//! by `(repository, base, head)` and posted-comment snapshots keyed by
//! `(repository, pull_request, head)`. The cache is owned by the
//! orchestrating layer and handed in — never a process-wide static.
//!
//! Key (stable across re-runs): SHA256 over the identity tuple, hex-truncated
//! to 12 chars and prefixed with the tuple kind for debuggability.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::errors::ReviewResult;
use crate::types::{CommentsSnapshot, DiffSet};

/// Minimal key-value store the orchestrator supplies.
pub trait ReviewCache {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: String, value: String);
}

/// In-memory implementation, good enough for single-process orchestrators
/// and for tests.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: BTreeMap<String, String>,
}

impl ReviewCache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: String, value: String) {
        self.entries.insert(key, value);
    }
}

fn sha12(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..12].to_string()
}

/// Deterministic key for a parsed diff between two commits.
pub fn diff_key(repository: &str, base_sha: &str, head_sha: &str) -> String {
    format!("diff:{}", sha12(&format!("{repository}:{base_sha}:{head_sha}")))
}

/// Deterministic key for a posted-comments snapshot.
pub fn comments_key(repository: &str, pull_request: u64, head_sha: &str) -> String {
    format!(
        "comments:{}",
        sha12(&format!("{repository}:{pull_request}:{head_sha}"))
    )
}

/// Loads a cached [`DiffSet`] if present.
pub fn load_diff_set<C: ReviewCache>(cache: &C, key: &str) -> ReviewResult<Option<DiffSet>> {
    match cache.get(key) {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// Stores a parsed [`DiffSet`] under `key`.
pub fn store_diff_set<C: ReviewCache>(cache: &mut C, key: String, set: &DiffSet) -> ReviewResult<()> {
    cache.set(key, serde_json::to_string(set)?);
    Ok(())
}

/// Loads a cached posted-comments snapshot if present.
///
/// Only `Fetched` snapshots are ever stored; an `Unavailable` state is a
/// transient failure, not a cacheable fact.
pub fn load_comments<C: ReviewCache>(
    cache: &C,
    key: &str,
) -> ReviewResult<Option<CommentsSnapshot>> {
    match cache.get(key) {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// Stores a fetched snapshot under `key`; `Unavailable` is skipped.
pub fn store_comments<C: ReviewCache>(
    cache: &mut C,
    key: String,
    snapshot: &CommentsSnapshot,
) -> ReviewResult<()> {
    if matches!(snapshot, CommentsSnapshot::Unavailable) {
        return Ok(());
    }
    cache.set(key, serde_json::to_string(snapshot)?);
    Ok(())
}
