//! Core of a continuous-integration review bot: diff/patch model and
//! incremental issue reconciliation.
//!
//! The pipeline for one pull request:
//!
//! 1) **Parse** — raw unified-diff text between two commits becomes a
//!    [`DiffSet`]: one [`FileDiff`] per touched path, with classification,
//!    patch body and line statistics.
//! 2) **Map** — each file's patch body becomes a [`map::LineMap`] bridging
//!    patch ordinals and absolute new-file line numbers.
//! 3) **Reconcile** — findings from external analysis tools, translated
//!    through the line maps, are compared against previously posted comments
//!    to produce create/delete instructions under policy caps.
//!
//! Everything here is synchronous, I/O-free and referentially transparent:
//! diff text, findings and posted comments arrive as already-fetched values,
//! and identical inputs always yield an identical result. Network calls,
//! linter invocation and configuration belong to collaborators. The stages
//! log per-step `DEBUG` timings via `tracing`.

pub mod cache;
pub mod errors;
pub mod map;
pub mod parser;
pub mod reconcile;
pub mod types;

use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use tracing::debug;

use cache::ReviewCache;
use errors::{Error, ReviewResult};
use map::LineMap;
use reconcile::{ReconcileInput, policy::ReviewPolicy};
use types::{CommentsSnapshot, DiffSet, Finding, ReconciliationResult};

/// Everything the pipeline computed for one pull request: the parsed diff,
/// the per-file line maps derived from it, and the reconciliation verdict.
#[derive(Debug, Clone)]
pub struct ReviewPlan {
    pub diff: DiffSet,
    pub line_maps: BTreeMap<String, LineMap>,
    pub result: ReconciliationResult,
}

/// Runs the full core pipeline for one pull request.
///
/// # Errors
/// - [`errors::ParseError`] if `diff_text` is diff-tool failure output —
///   callers must fall back to an alternative diff source.
/// - [`errors::UpstreamError`] if `posted` is `Unavailable` — callers must
///   abort this pull request rather than treat it as "zero comments".
/// - `Validation` if a finding carries a zero line number.
pub fn plan_review(
    diff_text: &str,
    findings: &[Finding],
    posted: &CommentsSnapshot,
    out_of_scope: &HashSet<(String, u32)>,
    approved_paths: &HashSet<String>,
    policy: &ReviewPolicy,
) -> ReviewResult<ReviewPlan> {
    for f in findings {
        map::require_positive_line(f.file_line)
            .map_err(|_| Error::Validation(format!("finding at {}:0", f.file_path)))?;
    }

    let t0 = Instant::now();
    let diff = parser::parse_diff(diff_text)?;
    debug!(
        "plan: diff parsed, files={} ({} ms)",
        diff.files.len(),
        t0.elapsed().as_millis()
    );

    let t1 = Instant::now();
    let line_maps = build_line_maps(&diff);
    debug!(
        "plan: line maps built, files={} ({} ms)",
        line_maps.len(),
        t1.elapsed().as_millis()
    );

    let t2 = Instant::now();
    let result = reconcile::reconcile(
        &ReconcileInput {
            findings,
            line_maps: &line_maps,
            posted,
            out_of_scope,
            approved_paths,
        },
        policy,
    )?;
    debug!(
        "plan: reconciled, to_create={} to_delete={} ({} ms)",
        result.to_create.len(),
        result.to_delete.len(),
        t2.elapsed().as_millis()
    );

    Ok(ReviewPlan {
        diff,
        line_maps,
        result,
    })
}

/// Like [`plan_review`], but consults an injected cache for the parsed
/// [`DiffSet`] first, keyed by `(repository, base_sha, head_sha)`.
///
/// The cache is owned by the orchestrator; the core stays pure.
pub fn plan_review_cached<C: ReviewCache>(
    review_cache: &mut C,
    repository: &str,
    base_sha: &str,
    head_sha: &str,
    diff_text: &str,
    findings: &[Finding],
    posted: &CommentsSnapshot,
    out_of_scope: &HashSet<(String, u32)>,
    approved_paths: &HashSet<String>,
    policy: &ReviewPolicy,
) -> ReviewResult<ReviewPlan> {
    let key = cache::diff_key(repository, base_sha, head_sha);

    let diff = match cache::load_diff_set(review_cache, &key)? {
        Some(set) => {
            debug!("plan: diff cache hit key={}", key);
            set
        }
        None => {
            let set = parser::parse_diff(diff_text)?;
            cache::store_diff_set(review_cache, key, &set)?;
            set
        }
    };

    let line_maps = build_line_maps(&diff);
    let result = reconcile::reconcile(
        &ReconcileInput {
            findings,
            line_maps: &line_maps,
            posted,
            out_of_scope,
            approved_paths,
        },
        policy,
    )?;

    Ok(ReviewPlan {
        diff,
        line_maps,
        result,
    })
}

/// One [`LineMap`] per touched file. Permission-only changes produce an
/// empty map: no finding can be attributed to them.
fn build_line_maps(diff: &DiffSet) -> BTreeMap<String, LineMap> {
    diff.files
        .iter()
        .map(|(path, file)| (path.clone(), LineMap::build(&file.patch_text)))
        .collect()
}

// -----------------------------------------------------------------------------
// Convenience re-exports for downstream users
// -----------------------------------------------------------------------------

pub use errors::{ParseError, UpstreamError};
pub use map::LineMap as PatchLineMap;
pub use reconcile::policy::ReviewPolicy as Policy;
pub use types::{
    Category, FileDiff, FileStatus, Finding as LintFinding, PostedComment,
    ReconciliationResult as ReviewOutcome,
};
