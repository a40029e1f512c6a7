use std::fmt;

use serde::{Deserialize, Serialize};

/// A tool-name pattern from a policy's `applies_to.tools` list.
///
/// A pattern without `*` matches only the identical tool name. Each `*`
/// matches zero or more arbitrary characters, and the pattern is anchored at
/// both ends: `message.*` matches `message.send` but not
/// `external.message.send`.
///
/// The pattern is compiled into its literal segments when constructed, so
/// matching never re-parses the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ToolPattern {
    raw: String,
    compiled: Compiled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Compiled {
    Exact,
    /// Literal text between wildcards. Always `stars + 1` entries; empty
    /// entries come from leading, trailing or adjacent `*`.
    Wildcard { segments: Vec<String> },
}

impl ToolPattern {
    /// Compile a pattern. Never fails; use [`ToolPattern::check`] to reject
    /// malformed input before it reaches a policy set.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let compiled = if raw.contains('*') {
            Compiled::Wildcard {
                segments: raw.split('*').map(str::to_string).collect(),
            }
        } else {
            Compiled::Exact
        };
        Self { raw, compiled }
    }

    /// The source text of the pattern.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self.compiled, Compiled::Wildcard { .. })
    }

    /// Reject patterns that can never name a real tool.
    pub fn check(&self) -> Result<(), String> {
        if self.raw.is_empty() {
            return Err("pattern is empty".to_string());
        }
        if self
            .raw
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            return Err("pattern contains whitespace or control characters".to_string());
        }
        Ok(())
    }

    /// Full-string match of `tool` against this pattern.
    pub fn matches(&self, tool: &str) -> bool {
        match &self.compiled {
            Compiled::Exact => self.raw == tool,
            Compiled::Wildcard { segments } => wildcard_matches(segments, tool),
        }
    }
}

/// Anchored match: the first segment is a prefix, the last a suffix, and the
/// middle segments occur in order in between. Leftmost placement of each middle
/// segment is optimal for `*`-only patterns, so no backtracking is needed.
fn wildcard_matches(segments: &[String], input: &str) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        return input.is_empty();
    };
    let Some((last, middle)) = rest.split_last() else {
        return first == input;
    };

    if input.len() < first.len() + last.len() {
        return false;
    }
    if !input.starts_with(first.as_str()) || !input.ends_with(last.as_str()) {
        return false;
    }

    let mut window = &input[first.len()..input.len() - last.len()];
    for segment in middle {
        match window.find(segment.as_str()) {
            Some(at) => window = &window[at + segment.len()..],
            None => return false,
        }
    }
    true
}

impl From<String> for ToolPattern {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for ToolPattern {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<ToolPattern> for String {
    fn from(pattern: ToolPattern) -> Self {
        pattern.raw
    }
}

impl fmt::Display for ToolPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, tool: &str) -> bool {
        ToolPattern::new(pattern).matches(tool)
    }

    // ---- exact ----

    #[test]
    fn exact_match() {
        assert!(matches("fs.delete", "fs.delete"));
        assert!(!matches("fs.delete", "fs.delete2"));
        assert!(!matches("fs.delete", "fs"));
        assert!(!ToolPattern::new("fs.delete").is_wildcard());
    }

    #[test]
    fn exact_is_case_sensitive() {
        assert!(!matches("Email.Send", "email.send"));
    }

    // ---- wildcard ----

    #[test]
    fn trailing_wildcard_is_full_string() {
        assert!(matches("message.*", "message.send"));
        assert!(matches("message.*", "message."));
        assert!(!matches("message.*", "external.message.send"));
        assert!(!matches("message.*", "message"));
    }

    #[test]
    fn bare_star_matches_everything() {
        assert!(matches("*", "anything.at.all"));
        assert!(matches("*", ""));
    }

    #[test]
    fn leading_and_inner_wildcards() {
        assert!(matches("*.send", "email.send"));
        assert!(!matches("*.send", "email.sender"));
        assert!(matches("fs.*.tmp", "fs.write.tmp"));
        assert!(matches("a*b*c", "abc"));
        assert!(matches("a*b*c", "a-x-b-y-c"));
        assert!(!matches("a*b*c", "a-x-c-y-b"));
    }

    #[test]
    fn prefix_and_suffix_may_not_overlap() {
        assert!(!matches("ab*ba", "aba"));
        assert!(matches("ab*ba", "abba"));
    }

    #[test]
    fn adjacent_stars_behave_like_one() {
        assert!(matches("exec.**", "exec.rm"));
        assert!(matches("**", ""));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        assert!(matches("fs.(read)", "fs.(read)"));
        assert!(!matches("fs.*", "fsXread"));
        assert!(matches("a+b*", "a+bc"));
        assert!(!matches("a+b*", "aab"));
    }

    #[test]
    fn multibyte_input() {
        assert!(matches("héllo.*", "héllo.wörld"));
        assert!(matches("*ö*", "wörld"));
    }

    // ---- validation ----

    #[test]
    fn check_rejects_empty_and_whitespace() {
        assert!(ToolPattern::new("").check().is_err());
        assert!(ToolPattern::new("email send").check().is_err());
        assert!(ToolPattern::new("email\tsend").check().is_err());
        assert!(ToolPattern::new("email.*").check().is_ok());
    }

    #[test]
    fn serde_uses_the_source_text() {
        let pattern: ToolPattern = serde_json::from_str("\"exec.*\"").unwrap();
        assert!(pattern.is_wildcard());
        assert_eq!(serde_json::to_string(&pattern).unwrap(), "\"exec.*\"");
    }
}
