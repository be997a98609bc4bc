//! Comment-body normalization for duplicate detection.
//!
//! Posted comment bodies accumulate presentation noise the raw finding
//! message never had: bold markers, `Warning:`-style labels, emoji glyphs,
//! a trailing `(Standard.Rule)` suffix, a `(severity N)` annotation, and
//! HTML-entity encoding applied by the platform on read-back. Two bodies are
//! "the same finding" when they agree after stripping all of that.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Leading severity label, optionally bold: `**Warning**:`, `Error:`, ...
    static ref LABEL_RE: Regex =
        Regex::new(r"^(?:\*\*)?(?:warning|error|info)(?:\*\*)?\s*:\s*").unwrap();
    /// Parenthesized severity annotation anywhere in the body.
    static ref SEVERITY_NOTE_RE: Regex = Regex::new(r"\s*\(\s*severity\s*[:=]?\s*\d+\s*\)").unwrap();
    /// Trailing parenthesized tool rule name, e.g. `(Standard.Sub.Rule)`,
    /// with an optional trailing period.
    static ref RULE_SUFFIX_RE: Regex =
        Regex::new(r"\s*\([a-z0-9_][a-z0-9_.\-]*\)\s*\.?\s*$").unwrap();
}

/// Emoji glyphs the bot prepends to bodies by category.
const EMOJI_GLYPHS: &[&str] = &["⚠️", "❌", "ℹ️", "🛑", "⚠", "ℹ"];

/// Normalizes a comment body or finding message into a comparison key.
///
/// Lowercases, strips bold markers, severity labels, emoji, the parenthesized
/// severity annotation, the trailing rule-name suffix, and a trailing period.
/// Comparison is exact (case-insensitive by construction) on the result.
pub fn normalize_body(body: &str) -> String {
    let mut s = body.trim().to_lowercase();

    for glyph in EMOJI_GLYPHS {
        s = s.replace(glyph, "");
    }
    s = s.replace("**", "");
    let s = LABEL_RE.replace(s.trim(), "").into_owned();
    let s = SEVERITY_NOTE_RE.replace_all(&s, "").into_owned();
    let s = RULE_SUFFIX_RE.replace(&s, "").into_owned();

    s.trim().trim_end_matches('.').trim().to_string()
}

/// HTML-entity encodes a message the way the platform encodes bodies on
/// read-back, so a fresh finding can be compared against a stored body.
pub fn html_entity_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// True when a posted body and a new message denote the same finding.
///
/// Tries the message verbatim and its HTML-entity-encoded variant.
pub fn bodies_match(posted_body: &str, new_message: &str) -> bool {
    let posted = normalize_body(posted_body);
    posted == normalize_body(new_message)
        || posted == normalize_body(&html_entity_encode(new_message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_bold_label_rule_suffix_and_period() {
        // Property P5 fixture.
        let posted = "**Warning**: Unused variable `$x`. (Standard.Rule).";
        let fresh = "Unused variable `$x`.";
        assert!(bodies_match(posted, fresh));
        assert_eq!(normalize_body(posted), "unused variable `$x`");
    }

    #[test]
    fn strips_severity_annotation() {
        assert_eq!(
            normalize_body("Error: Missing nonce check ( severity: 7 )."),
            "missing nonce check"
        );
    }

    #[test]
    fn strips_emoji_glyphs() {
        assert_eq!(normalize_body("⚠️ Warning: Deprecated call."), "deprecated call");
    }

    #[test]
    fn html_encoded_readback_still_matches() {
        // Platform encodes on read-back; fresh message is raw.
        let posted = "Use `wp_json_encode()` instead of `json_encode()` for `&amp;` safety";
        let fresh = "Use `wp_json_encode()` instead of `json_encode()` for `&` safety";
        assert!(bodies_match(posted, fresh));
    }

    #[test]
    fn different_messages_do_not_match() {
        assert!(!bodies_match("Unused variable `$x`.", "Unused variable `$y`."));
    }

    #[test]
    fn rule_suffix_mid_sentence_parens_survive() {
        // Only a *trailing* parenthesized token is a rule suffix.
        assert_eq!(
            normalize_body("Call to undefined function (or method) foo"),
            "call to undefined function (or method) foo"
        );
    }

    #[test]
    fn entity_encoding_covers_the_platform_set() {
        assert_eq!(html_entity_encode(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }
}
