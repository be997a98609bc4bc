//! Patch line mapping: one file's patch text → [`LineMap`].
//!
//! The remote platform anchors inline comments to *patch ordinals* (1-based
//! index of a line within the file's patch text), while analysis tools report
//! *absolute line numbers* in the new file content. `LineMap` bridges the two:
//! forward lookup ordinal → new-file line, reverse lookup new-file line →
//! first ordinal. Lines that do not exist in the new file (removals, hunk
//! headers, `\ No newline` markers) are unmapped.

use crate::errors::{Error, ReviewResult};

/// Ordinal → new-file line table for one file's patch.
///
/// Invariants:
/// - mapped values are monotonically non-decreasing in ordinal order;
/// - ordinal 1 always resolves to file line 1 when it would otherwise be
///   unmapped or zero (guards against 0-anchored first hunks).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineMap {
    entries: Vec<Option<u32>>,
}

impl LineMap {
    /// Walks `patch_text` line by line and builds the map.
    ///
    /// Empty patch text (permission-only change) yields an empty map; callers
    /// must treat "no entry" as "cannot attribute a finding to this diff".
    pub fn build(patch_text: &str) -> Self {
        let mut entries: Vec<Option<u32>> = Vec::new();
        let mut next_new_line: u32 = 1;

        for line in patch_text.lines() {
            if line.is_empty() {
                // Buffering artifact: a genuine empty context or added line
                // carries its one-character prefix. No ordinal consumed.
                continue;
            }
            if line.starts_with("@@") {
                if let Some(start) = hunk_new_start(line) {
                    next_new_line = start;
                }
                entries.push(None);
            } else if line.starts_with('-') || line.starts_with('\\') {
                entries.push(None);
            } else if line.starts_with('+') || line.starts_with(' ') || line.starts_with('\t') {
                entries.push(Some(next_new_line));
                next_new_line += 1;
            } else {
                entries.push(None);
            }
        }

        // Line-1 guard: the first ordinal must resolve to file line 1 if it
        // is absent or zero (0-anchored first hunks on brand-new files).
        match entries.first_mut() {
            Some(slot) if slot.is_none() || *slot == Some(0) => *slot = Some(1),
            Some(_) => {}
            None if !patch_text.is_empty() => entries.push(Some(1)),
            None => {}
        }

        Self { entries }
    }

    /// New-file line for a 1-based patch ordinal, if mapped.
    pub fn get(&self, ordinal: u32) -> Option<u32> {
        if ordinal == 0 {
            return None;
        }
        self.entries.get(ordinal as usize - 1).copied().flatten()
    }

    /// First 1-based patch ordinal that maps to `file_line`, if any.
    ///
    /// Values are monotonic, so the first hit is the canonical anchor.
    pub fn position_of(&self, file_line: u32) -> Option<u32> {
        self.entries
            .iter()
            .position(|e| *e == Some(file_line))
            .map(|idx| idx as u32 + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Extracts `newStart` from a `@@ -oldStart,oldLen +newStart,newLen @@` header.
fn hunk_new_start(line: &str) -> Option<u32> {
    let inner = line.trim_start_matches('@').trim_end_matches('@').trim();
    let (_, right) = inner.split_once('+')?;
    let nums = right.trim();
    let start_str = nums.split(|c: char| c == ',' || c.is_whitespace()).next()?;
    start_str.parse().ok()
}

/// Convenience validation used by the pipeline entry.
pub fn require_positive_line(file_line: u32) -> ReviewResult<()> {
    if file_line == 0 {
        return Err(Error::Validation("file_line must be >= 1".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn added_file_hunk_maps_one_to_one() {
        let patch = "@@ -0,0 +1,3 @@\n+<?php\n+echo 1;\n+echo 2;";
        let map = LineMap::build(patch);
        assert_eq!(map.len(), 4);
        // Header ordinal is forced to file line 1 by the guard.
        assert_eq!(map.get(1), Some(1));
        // The three added lines map to file lines 1..=3.
        assert_eq!(map.get(2), Some(1));
        assert_eq!(map.get(3), Some(2));
        assert_eq!(map.get(4), Some(3));
    }

    #[test]
    fn line_one_guard_on_malformed_header() {
        let map = LineMap::build("@@ garbage @@\n+only line");
        assert_eq!(map.get(1), Some(1));
    }

    #[test]
    fn removals_and_markers_are_unmapped() {
        let patch = "@@ -1,3 +1,2 @@\n context\n-gone\n another\n\\ No newline at end of file";
        let map = LineMap::build(patch);
        assert_eq!(map.get(2), Some(1)); // " context"
        assert_eq!(map.get(3), None); // "-gone"
        assert_eq!(map.get(4), Some(2)); // " another"
        assert_eq!(map.get(5), None); // "\ marker"
    }

    #[test]
    fn second_hunk_resets_counter() {
        let patch = "@@ -1,2 +1,2 @@\n a\n+b\n@@ -10,2 +20,2 @@\n c\n+d";
        let map = LineMap::build(patch);
        assert_eq!(map.get(2), Some(1));
        assert_eq!(map.get(3), Some(2));
        assert_eq!(map.get(4), None); // second header
        assert_eq!(map.get(5), Some(20));
        assert_eq!(map.get(6), Some(21));
    }

    #[test]
    fn mapped_values_are_monotonic() {
        let patch = "@@ -1,4 +1,4 @@\n a\n-b\n+B\n c\n d";
        let map = LineMap::build(patch);
        let mut prev = 0u32;
        for ord in 1..=map.len() as u32 {
            if let Some(v) = map.get(ord) {
                assert!(v >= prev, "ordinal {ord}: {v} < {prev}");
                prev = v;
            }
        }
    }

    #[test]
    fn reverse_lookup_finds_first_ordinal() {
        let patch = "@@ -1,2 +1,3 @@\n a\n+b\n c";
        let map = LineMap::build(patch);
        assert_eq!(map.position_of(2), Some(3)); // "+b"
        assert_eq!(map.position_of(3), Some(4)); // " c"
        assert_eq!(map.position_of(99), None);
    }

    #[test]
    fn empty_patch_is_an_empty_map() {
        let map = LineMap::build("");
        assert!(map.is_empty());
        assert_eq!(map.get(1), None);
        assert_eq!(map.position_of(1), None);
    }

    #[test]
    fn empty_interior_lines_consume_no_ordinal() {
        // Stored patch text may contain length-0 lines from blank buffering;
        // they are continuations, not ordinals.
        let patch = "@@ -1,2 +1,2 @@\n a\n\n+b";
        let map = LineMap::build(patch);
        assert_eq!(map.len(), 3);
        assert_eq!(map.get(3), Some(2));
    }

    #[test]
    fn tab_prefixed_context_maps() {
        let patch = "@@ -1,1 +1,1 @@\n\tindented context";
        let map = LineMap::build(patch);
        assert_eq!(map.get(2), Some(1));
    }
}
