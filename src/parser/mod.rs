//! Unified-diff parser: raw repository-wide diff text → [`DiffSet`].
//!
//! Features:
//! - Two-state line machine (`Info` → headers, `Patch` → hunk body) driven by
//!   a pure reducer: one `step` per input line on an owned state value, so the
//!   transition table is auditable and testable in isolation.
//! - Tolerates CRLF line endings, paths with spaces (trailing-tab cleanup),
//!   permission-only diffs with no hunks, and a missing trailing newline.
//! - Rejects diff-tool failure output (`fatal:` / `error:` / `usage:`) so the
//!   caller can fall back to an alternative diff source.

use tracing::debug;

use crate::errors::ParseError;
use crate::types::{DiffSet, FileDiff, FileStatus};

/// Parses one repository-wide unified diff into a [`DiffSet`].
///
/// An empty input is valid and yields an empty set. Only input that is
/// clearly not diff content at all is fatal.
pub fn parse_diff(diff_text: &str) -> Result<DiffSet, ParseError> {
    if let Some(first) = diff_text.lines().find(|l| !l.trim().is_empty()) {
        let t = first.trim_start();
        if t.starts_with("fatal:") || t.starts_with("error:") || t.starts_with("usage:") {
            return Err(ParseError::FatalDiffOutput(t.to_string()));
        }
    }

    let mut state = ParserState::new();
    for raw in diff_text.lines() {
        // CRLF inputs: operate on the logical line.
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        state = state.step(line);
    }
    let set = state.finish();
    debug!(
        "parse: files={} +{} -{} (changes={})",
        set.files.len(),
        set.additions,
        set.deletions,
        set.changes
    );
    Ok(set)
}

/// Parser mode: header lines vs. hunk body lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseMode {
    Info,
    Patch,
}

/// Accumulated state for the file currently being parsed.
#[derive(Debug, Clone, Default)]
struct FileState {
    old_path: Option<String>,
    new_path: Option<String>,
    renamed_from: Option<String>,
    patch: String,
    /// Blank patch lines held back until a non-blank line follows, so
    /// trailing blanks never corrupt the stored patch.
    pending_blanks: usize,
    additions: u32,
    deletions: u32,
}

/// Whole-parse state threaded through the reducer.
#[derive(Debug, Clone)]
struct ParserState {
    mode: ParseMode,
    current: Option<FileState>,
    set: DiffSet,
}

impl ParserState {
    fn new() -> Self {
        Self {
            mode: ParseMode::Info,
            current: None,
            set: DiffSet::default(),
        }
    }

    /// One reducer step: consume a single logical line, return the next state.
    fn step(mut self, line: &str) -> Self {
        if let Some(trailer) = line.strip_prefix("diff --git ") {
            self.flush_current();
            let mut fs = FileState::default();
            // Tentative paths from the trailer, only when it splits into
            // exactly two tokens (paths with spaces fall back to ---/+++).
            let tokens: Vec<&str> = trailer.split_whitespace().collect();
            if tokens.len() == 2 {
                fs.old_path = Some(clean_path(tokens[0]).to_string());
                fs.new_path = Some(clean_path(tokens[1]).to_string());
            }
            self.current = Some(fs);
            self.mode = ParseMode::Info;
            return self;
        }

        match self.mode {
            ParseMode::Info => self.step_info(line),
            ParseMode::Patch => self.step_patch(line),
        }
    }

    fn step_info(mut self, line: &str) -> Self {
        let Some(fs) = self.current.as_mut() else {
            // Prelude before the first `diff --git` line.
            return self;
        };

        // `old mode`/`new mode` headers need no state of their own: a
        // permission-only change resolves to Modified through path equality,
        // with zero changed lines and an empty patch body.
        if let Some(p) = line.strip_prefix("rename from ") {
            fs.renamed_from = Some(clean_path(p).to_string());
            fs.old_path = Some(clean_path(p).to_string());
        } else if let Some(p) = line.strip_prefix("rename to ") {
            fs.new_path = Some(clean_path(p).to_string());
        } else if let Some(p) = line.strip_prefix("--- ") {
            fs.old_path = Some(clean_path(p).to_string());
        } else if let Some(p) = line.strip_prefix("+++ ") {
            fs.new_path = Some(clean_path(p).to_string());
        } else if line.starts_with("@@") {
            self.mode = ParseMode::Patch;
            return self.step_patch(line);
        }
        self
    }

    fn step_patch(mut self, line: &str) -> Self {
        let Some(fs) = self.current.as_mut() else {
            return self;
        };

        if line.is_empty() {
            fs.pending_blanks += 1;
            return self;
        }

        // Flush buffered blanks now that a non-blank line follows them.
        for _ in 0..fs.pending_blanks {
            fs.patch.push('\n');
        }
        fs.pending_blanks = 0;

        // First patch line receives no leading newline.
        if !fs.patch.is_empty() {
            fs.patch.push('\n');
        }
        fs.patch.push_str(line);

        if line.starts_with('+') {
            fs.additions += 1;
        } else if line.starts_with('-') {
            fs.deletions += 1;
        }
        self
    }

    /// Fold the current file (if any) into the set.
    fn flush_current(&mut self) {
        let Some(fs) = self.current.take() else {
            return;
        };
        let Some(diff) = resolve_file(fs) else {
            return;
        };
        self.set.additions += diff.additions;
        self.set.deletions += diff.deletions;
        self.set.changes += diff.changes;
        // Exactly one FileDiff per distinct final path: a later diff for the
        // same path replaces the earlier one, counters included.
        if let Some(prev) = self.set.files.insert(diff.path.clone(), diff) {
            self.set.additions -= prev.additions;
            self.set.deletions -= prev.deletions;
            self.set.changes -= prev.changes;
        }
    }

    fn finish(mut self) -> DiffSet {
        self.flush_current();
        self.set
    }
}

/// Resolve accumulated per-file state into a [`FileDiff`].
///
/// Status rules: old == new → Modified; old == `/dev/null` → Added;
/// new == `/dev/null` → Removed; otherwise Renamed. A rename with at least
/// one changed line collapses to Modified, `previous_path` retained.
fn resolve_file(fs: FileState) -> Option<FileDiff> {
    let changes = fs.additions + fs.deletions;

    let (path, status, previous_path) = match (fs.old_path, fs.new_path) {
        (Some(old), Some(new)) => {
            if old == new {
                (new, FileStatus::Modified, fs.renamed_from)
            } else if old == "/dev/null" {
                (new, FileStatus::Added, None)
            } else if new == "/dev/null" {
                (old, FileStatus::Removed, None)
            } else if changes > 0 {
                // Rename with content edits: report Modified, keep the
                // rename relationship.
                (new, FileStatus::Modified, Some(old))
            } else {
                (new, FileStatus::Renamed, Some(old))
            }
        }
        (None, Some(new)) => (new, FileStatus::Modified, fs.renamed_from),
        (Some(old), None) => (old, FileStatus::Modified, fs.renamed_from),
        (None, None) => return None,
    };

    Some(FileDiff {
        path,
        previous_path,
        status,
        patch_text: fs.patch,
        additions: fs.additions,
        deletions: fs.deletions,
        changes,
    })
}

/// Strip the `a/`/`b/` prefix a diff generator adds and the stray trailing
/// tab some generators leave after paths containing spaces.
fn clean_path(raw: &str) -> &str {
    let p = raw.trim_end_matches('\t');
    if let Some(rest) = p.strip_prefix("a/") {
        rest
    } else if let Some(rest) = p.strip_prefix("b/") {
        rest
    } else {
        p
    }
}
