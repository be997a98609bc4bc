//! Issue reconciliation: decide, across repeated runs against a mutable pull
//! request, which findings are new (post), which were already posted
//! (suppress), and which posted comments must be retracted.
//!
//! A single finding's lifecycle:
//! `Produced → attribution filter → InScope | Dropped`;
//! `InScope → duplicate filters → New | AlreadyPosted`;
//! `New → capping → ToCreate | Suppressed`.
//!
//! Every step is a private function with its own tests; `reconcile` is the
//! composition, referentially transparent given its inputs.

pub mod normalize;
pub mod policy;

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::errors::{ReviewResult, UpstreamError};
use crate::map::LineMap;
use crate::reconcile::normalize::{bodies_match, normalize_body};
use crate::reconcile::policy::{ReviewPolicy, cap_by_severity};
use crate::types::{CommentsSnapshot, Finding, PostedComment, ReconciliationResult};

/// Everything a reconciliation call consumes. All of it is fetched/computed
/// by collaborators beforehand; this core performs no I/O.
#[derive(Debug)]
pub struct ReconcileInput<'a> {
    /// Findings produced by the external tools for this commit.
    pub findings: &'a [Finding],
    /// Per-file line maps for every path touched by the diff.
    pub line_maps: &'a BTreeMap<String, LineMap>,
    /// Comments the bot posted in earlier runs, or `Unavailable` on a fetch
    /// failure (which aborts reconciliation rather than guessing "empty").
    pub posted: &'a CommentsSnapshot,
    /// `(path, file_line)` pairs the blame filter judged as not authored by
    /// a commit of this pull request.
    pub out_of_scope: &'a HashSet<(String, u32)>,
    /// Paths currently holding approval; posted approval-marker comments for
    /// any other path are retracted.
    pub approved_paths: &'a HashSet<String>,
}

/// A finding that survived attribution, together with its patch position.
#[derive(Debug, Clone)]
struct AnchoredFinding {
    finding: Finding,
    patch_position: u32,
}

/// Runs the full reconciliation for one pull request.
pub fn reconcile(
    input: &ReconcileInput<'_>,
    policy: &ReviewPolicy,
) -> ReviewResult<ReconciliationResult> {
    let posted = match input.posted {
        CommentsSnapshot::Fetched(list) => list.as_slice(),
        CommentsSnapshot::Unavailable => {
            return Err(UpstreamError::PostedCommentsUnavailable.into());
        }
    };

    let (anchored, unattributed) = attribute_findings(input, policy);
    debug!(
        "reconcile: attributed={} unattributed={}",
        anchored.len(),
        unattributed
    );

    let fresh = drop_already_posted(anchored, posted);
    let mut candidates = dedup_within_batch(fresh);
    debug!("reconcile: candidates after dedup={}", candidates.len());

    let active_posted = posted.iter().filter(|c| c.is_active).count();
    let total = candidates.len() + active_posted;
    if total > policy.max_comments_per_pr {
        let excess = total - policy.max_comments_per_pr;
        debug!(
            "reconcile: cap {} exceeded by {}, evicting lowest severity first",
            policy.max_comments_per_pr, excess
        );
        let mut findings: Vec<Finding> = candidates.iter().map(|a| a.finding.clone()).collect();
        cap_by_severity(&mut findings, excess);
        let keep: HashSet<(String, u32, String)> = findings
            .iter()
            .map(|f| (f.file_path.clone(), f.file_line, f.message.clone()))
            .collect();
        candidates.retain(|a| {
            keep.contains(&(
                a.finding.file_path.clone(),
                a.finding.file_line,
                a.finding.message.clone(),
            ))
        });
    }

    let to_delete = find_obsolete(input, policy, posted);

    let to_create: Vec<Finding> = candidates.into_iter().map(|a| a.finding).collect();
    let mut counts_by_severity: BTreeMap<u8, usize> = BTreeMap::new();
    for f in &to_create {
        *counts_by_severity.entry(f.severity_level).or_default() += 1;
    }

    debug!(
        "reconcile: to_create={} to_delete={}",
        to_create.len(),
        to_delete.len()
    );

    Ok(ReconciliationResult {
        to_create,
        to_delete,
        counts_by_severity,
        unattributed,
    })
}

/// Step 1: attribution filter.
///
/// Drops findings with no patch position (outside the diff's visible
/// context — counted for observability), findings the blame filter ruled out
/// of scope, and findings on the operator ignore-list.
fn attribute_findings(
    input: &ReconcileInput<'_>,
    policy: &ReviewPolicy,
) -> (Vec<AnchoredFinding>, usize) {
    let mut anchored = Vec::new();
    let mut unattributed = 0usize;

    for f in input.findings {
        if policy.is_ignored(&f.message) {
            continue;
        }
        if input
            .out_of_scope
            .contains(&(f.file_path.clone(), f.file_line))
        {
            continue;
        }
        let position = input
            .line_maps
            .get(&f.file_path)
            .and_then(|m| m.position_of(f.file_line));
        match position {
            Some(patch_position) => anchored.push(AnchoredFinding {
                finding: f.clone(),
                patch_position,
            }),
            None => unattributed += 1,
        }
    }

    (anchored, unattributed)
}

/// Step 2: duplicate-against-posted filter.
///
/// A posted comment at the same file and patch position whose normalized
/// body matches the finding message (verbatim or HTML-entity-encoded) means
/// "already posted".
fn drop_already_posted(
    anchored: Vec<AnchoredFinding>,
    posted: &[PostedComment],
) -> Vec<AnchoredFinding> {
    anchored
        .into_iter()
        .filter(|a| {
            !posted.iter().any(|c| {
                c.file_path == a.finding.file_path
                    && c.patch_position == a.patch_position
                    && bodies_match(&c.body, &a.finding.message)
            })
        })
        .collect()
}

/// Step 3: duplicate-within-batch filter.
///
/// Collapses findings sharing an identical file, line and message (the same
/// tool reporting twice in one run). First occurrence wins.
fn dedup_within_batch(anchored: Vec<AnchoredFinding>) -> Vec<AnchoredFinding> {
    let mut seen: HashSet<(String, u32, String)> = HashSet::new();
    anchored
        .into_iter()
        .filter(|a| {
            seen.insert((
                a.finding.file_path.clone(),
                a.finding.file_line,
                a.finding.message.clone(),
            ))
        })
        .collect()
}

/// Step 5: obsolete-comment detection.
///
/// Retracts posted comments whose file left the diff entirely, and approval
/// comments whose file is no longer approved. Returns comment ids, ordered.
fn find_obsolete(
    input: &ReconcileInput<'_>,
    policy: &ReviewPolicy,
    posted: &[PostedComment],
) -> Vec<u64> {
    let marker = normalize_body(&policy.approval_marker);
    let mut ids: Vec<u64> = posted
        .iter()
        .filter(|c| {
            if !input.line_maps.contains_key(&c.file_path) {
                return true;
            }
            !marker.is_empty()
                && normalize_body(&c.body).contains(&marker)
                && !input.approved_paths.contains(&c.file_path)
        })
        .map(|c| c.id)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}
