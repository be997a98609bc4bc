//! Review policy: comment caps, ignore lists, approval marker.

use crate::reconcile::normalize::normalize_body;
use crate::types::Finding;

/// Limits and knobs applied during reconciliation.
#[derive(Debug, Clone)]
pub struct ReviewPolicy {
    /// Maximum outstanding comments per pull request, counting both the
    /// candidates of this run and previously posted, still-active comments.
    pub max_comments_per_pr: usize,
    /// Normalized messages to drop entirely (the operator's ignore list).
    pub ignored_messages: Vec<String>,
    /// Marker embedded in "previously approved" comment bodies. A posted
    /// comment carrying it is retracted once its file loses approval.
    pub approval_marker: String,
}

impl Default for ReviewPolicy {
    fn default() -> Self {
        Self {
            max_comments_per_pr: 100,
            ignored_messages: Vec::new(),
            approval_marker: "auto-approved".to_string(),
        }
    }
}

impl ReviewPolicy {
    /// True if the operator ignore-list suppresses this message.
    pub fn is_ignored(&self, message: &str) -> bool {
        let normalized = normalize_body(message);
        self.ignored_messages
            .iter()
            .any(|m| normalize_body(m) == normalized)
    }
}

/// Removes `excess` findings starting from the lowest severity level,
/// exhausting each level before moving to the next, so higher-severity
/// findings are always preferred for retention.
///
/// Within one level the latest-collected candidates go first; relative order
/// of the survivors is preserved.
pub fn cap_by_severity(candidates: &mut Vec<Finding>, mut excess: usize) {
    if excess == 0 {
        return;
    }

    let mut levels: Vec<u8> = candidates.iter().map(|f| f.severity_level).collect();
    levels.sort_unstable();
    levels.dedup();

    for level in levels {
        if excess == 0 {
            break;
        }
        // Walk from the back so earlier findings at this level survive.
        let mut idx = candidates.len();
        while idx > 0 && excess > 0 {
            idx -= 1;
            if candidates[idx].severity_level == level {
                candidates.remove(idx);
                excess -= 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;

    fn finding(severity: u8, msg: &str) -> Finding {
        Finding {
            file_path: "a.php".into(),
            file_line: 1,
            message: msg.into(),
            severity_level: severity,
            category: Category::Warning,
        }
    }

    #[test]
    fn cap_prefers_high_severity() {
        // Property P4: severities [1,1,1,5,5,5,9,9,9,9], remove 4 →
        // all three 1s and exactly one 5 go; every 9 stays.
        let mut fs: Vec<Finding> = [1, 1, 1, 5, 5, 5, 9, 9, 9, 9]
            .iter()
            .enumerate()
            .map(|(i, s)| finding(*s, &format!("m{i}")))
            .collect();
        cap_by_severity(&mut fs, 4);
        assert_eq!(fs.len(), 6);
        assert_eq!(fs.iter().filter(|f| f.severity_level == 1).count(), 0);
        assert_eq!(fs.iter().filter(|f| f.severity_level == 5).count(), 2);
        assert_eq!(fs.iter().filter(|f| f.severity_level == 9).count(), 4);
    }

    #[test]
    fn cap_is_stable_for_survivors() {
        let mut fs = vec![finding(5, "first"), finding(1, "gone"), finding(5, "second")];
        cap_by_severity(&mut fs, 1);
        let msgs: Vec<&str> = fs.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(msgs, vec!["first", "second"]);
    }

    #[test]
    fn zero_excess_is_a_no_op() {
        let mut fs = vec![finding(1, "kept")];
        cap_by_severity(&mut fs, 0);
        assert_eq!(fs.len(), 1);
    }

    #[test]
    fn excess_beyond_len_empties() {
        let mut fs = vec![finding(1, "a"), finding(2, "b")];
        cap_by_severity(&mut fs, 10);
        assert!(fs.is_empty());
    }

    #[test]
    fn ignore_list_matches_normalized() {
        let policy = ReviewPolicy {
            ignored_messages: vec!["Line exceeds maximum length".into()],
            ..Default::default()
        };
        assert!(policy.is_ignored("Warning: Line exceeds maximum length."));
        assert!(!policy.is_ignored("Tabs must be used for indentation"));
    }
}
