//! Provider-agnostic data model for diffs, findings and posted comments.
//!
//! These types are the "normalized output" of the parsing stage and the
//! inputs/outputs of reconciliation. They are plain values: no I/O handles,
//! no provider specifics, serde-serializable so callers can cache them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of a single touched file within a diff.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FileStatus {
    Added,
    Removed,
    Modified,
    Renamed,
}

/// One touched file: final-side path, classification, raw patch body and
/// line-level statistics.
///
/// Invariant: `changes == additions + deletions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDiff {
    /// Final-side path (new path for renames, old path for removals).
    pub path: String,
    /// Old path, kept whenever a rename was observed. Remains populated even
    /// after a rename-with-edits collapses `status` back to `Modified`, so
    /// both facts survive.
    pub previous_path: Option<String>,
    pub status: FileStatus,
    /// Raw unified-diff body for this file starting at its first `@@` line.
    /// Empty for permission-only changes.
    pub patch_text: String,
    pub additions: u32,
    pub deletions: u32,
    pub changes: u32,
}

/// The full parsed diff between two commits: one `FileDiff` per distinct
/// final path, in path order, plus aggregate counters.
///
/// Immutable once produced; created fresh per `(base, head)` pair and safe
/// to cache keyed by that pair plus repository identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffSet {
    pub files: BTreeMap<String, FileDiff>,
    pub additions: u32,
    pub deletions: u32,
    pub changes: u32,
}

impl DiffSet {
    /// True if `path` is touched by this diff.
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }
}

/// Issue category as reported by the external analysis tool.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Error,
    Warning,
    Info,
}

/// A single issue reported by an external analysis tool against an absolute
/// line in the new file content. Produced by collaborators; immutable here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Finding {
    pub file_path: String,
    /// Absolute 1-based line number in the new file content.
    pub file_line: u32,
    pub message: String,
    /// Small positive integer, higher = more severe.
    pub severity_level: u8,
    pub category: Category,
}

/// A review comment the bot posted in an earlier run, as read back from the
/// remote platform. Read-only to this core; referenced by `id` for deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostedComment {
    /// Platform identifier used in deletion requests.
    pub id: u64,
    pub file_path: String,
    /// Position in the diff the platform attached the comment to (1-based
    /// patch ordinal).
    pub patch_position: u32,
    /// Comment body as read back; the platform HTML-encodes it.
    pub body: String,
    pub review_id: Option<u64>,
    /// False once the underlying diff context became obsolete.
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// Posted comments at the collaborator boundary.
///
/// `Unavailable` means the fetch failed — a distinct state from an empty
/// list, because guessing "zero comments" would re-post and mass-delete
/// still-valid review state. Reconciliation refuses to run on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CommentsSnapshot {
    Fetched(Vec<PostedComment>),
    Unavailable,
}

/// Output of one reconciliation call. Produced fresh per call; identical
/// inputs always yield an identical result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconciliationResult {
    /// Findings to submit, ordered, after filtering/deduplication/capping.
    pub to_create: Vec<Finding>,
    /// Identifiers of posted comments judged obsolete.
    pub to_delete: Vec<u64>,
    /// Severity histogram over `to_create`, for statistics.
    pub counts_by_severity: BTreeMap<u8, usize>,
    /// Findings silently excluded because they could not be attributed to a
    /// visible diff position. Kept for observability, never an error.
    pub unattributed: usize,
}
