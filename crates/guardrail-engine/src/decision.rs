use std::fmt;

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

/// Machine-checkable explanation attached to every [`Verdict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reason {
    #[serde(rename = "policy does not apply")]
    PolicyDoesNotApply,
    #[serde(rename = "allowlisted")]
    Allowlisted,
    #[serde(rename = "blocked by policy")]
    BlockedByPolicy,
    #[serde(rename = "approved")]
    Approved,
    #[serde(rename = "approval required")]
    ApprovalRequired,
    #[serde(rename = "all policies passed")]
    AllPoliciesPassed,
}

impl Reason {
    pub fn as_str(self) -> &'static str {
        match self {
            Reason::PolicyDoesNotApply => "policy does not apply",
            Reason::Allowlisted => "allowlisted",
            Reason::BlockedByPolicy => "blocked by policy",
            Reason::Approved => "approved",
            Reason::ApprovalRequired => "approval required",
            Reason::AllPoliciesPassed => "all policies passed",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of evaluating one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub allowed: bool,
    /// The policy that produced this outcome; absent when no policy applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
    pub reason: Reason,
}

impl Verdict {
    /// Allow decision not attributable to any policy.
    pub fn allow_default(reason: Reason) -> Self {
        Self {
            allowed: true,
            policy_id: None,
            reason,
        }
    }

    pub fn allow(policy_id: impl Into<String>, reason: Reason) -> Self {
        Self {
            allowed: true,
            policy_id: Some(policy_id.into()),
            reason,
        }
    }

    pub fn deny(policy_id: impl Into<String>, reason: Reason) -> Self {
        Self {
            allowed: false,
            policy_id: Some(policy_id.into()),
            reason,
        }
    }

    /// Case-insensitive match of the reason against a fixture's expected
    /// pattern. Patterns that are not valid regexes are compared as
    /// case-insensitive substrings.
    pub fn reason_matches(&self, pattern: &str) -> bool {
        let reason = self.reason.as_str();
        match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(re) => re.is_match(reason),
            Err(_) => reason.to_lowercase().contains(&pattern.to_lowercase()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_default_has_no_policy() {
        let v = Verdict::allow_default(Reason::AllPoliciesPassed);
        assert!(v.allowed);
        assert!(v.policy_id.is_none());
        assert_eq!(v.reason.to_string(), "all policies passed");
    }

    #[test]
    fn deny_carries_policy_id() {
        let v = Verdict::deny("no_deletes", Reason::BlockedByPolicy);
        assert!(!v.allowed);
        assert_eq!(v.policy_id.as_deref(), Some("no_deletes"));
    }

    #[test]
    fn reason_serializes_as_text() {
        let v = Verdict::deny("p", Reason::ApprovalRequired);
        assert_eq!(
            serde_json::to_value(&v).unwrap(),
            serde_json::json!({"allowed": false, "policy_id": "p", "reason": "approval required"})
        );
        let back: Verdict = serde_json::from_str(
            r#"{"allowed": true, "reason": "policy does not apply"}"#,
        )
        .unwrap();
        assert_eq!(back, Verdict::allow_default(Reason::PolicyDoesNotApply));
    }

    #[test]
    fn reason_matching_is_case_insensitive() {
        let v = Verdict::deny("p", Reason::ApprovalRequired);
        assert!(v.reason_matches("approval"));
        assert!(v.reason_matches("APPROVAL REQUIRED"));
        assert!(v.reason_matches("^approval.*d$"));
        assert!(!v.reason_matches("blocked"));
    }

    #[test]
    fn invalid_regex_falls_back_to_substring() {
        let v = Verdict::deny("p", Reason::BlockedByPolicy);
        assert!(!v.reason_matches("(blocked"));
        assert!(Verdict::allow("p", Reason::Approved).reason_matches("APPROVED"));
    }
}
