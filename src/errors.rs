//! Crate-wide error hierarchy for lint-reviewer.
//!
//! Goals:
//! - Single root `Error` for all public functions.
//! - A hard split between "fatally malformed diff" (caller must fall back to
//!   another diff source) and "upstream data unknown" (caller must abort the
//!   pull request, never substitute an empty list).
//! - No dynamic dispatch, ergonomic `?` via `From` impls.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type ReviewResult<T> = Result<T, Error>;

/// Root error type for the lint-reviewer crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Unified diff parsing failure.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Collaborator-fetched inputs could not be determined.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// Cache payload (JSON) failure.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Input validation errors (bad paths, zero line numbers, etc.).
    #[error("validation error: {0}")]
    Validation(String),
}

/// Unified diff parser errors.
///
/// An *empty* diff is not an error; only input that is clearly not diff
/// content at all (tool failure output) is fatal.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The diff tool emitted an error message instead of diff content.
    #[error("diff tool produced failure output: {0}")]
    FatalDiffOutput(String),
}

/// "Unknown, as opposed to empty" states at the collaborator boundary.
///
/// Treating a failed fetch of posted comments as "zero comments" would make
/// reconciliation re-post everything and mass-delete still-valid review
/// state, so the distinction is carried in the type system.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The posted-comments list for the pull request could not be fetched.
    #[error("posted comments unavailable for this pull request")]
    PostedCommentsUnavailable,

    /// The findings list for the commit could not be determined.
    #[error("findings unavailable for this commit")]
    FindingsUnavailable,
}

/// Cache payload errors (serialization only; storage belongs to the caller).
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

// ===== Conversions for `?` ergonomics =====

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Cache(CacheError::Serde(e))
    }
}
