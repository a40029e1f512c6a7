//! In-process execution of the fixtures embedded in a policy set.
//!
//! Each fixture goes through [`evaluate`](crate::evaluate), the same function
//! generated suites call, so a passing run here and a passing generated suite
//! check the same thing.

use serde::Serialize;
use tracing::debug;

use crate::decision::Verdict;
use crate::evaluator::evaluate;
use crate::schema::{ConformanceTest, Policy, PolicySet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CaseOutcome {
    Passed,
    Failed { mismatch: String },
    /// The policy has no fixtures at all.
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    pub policy_id: String,
    pub test: String,
    pub outcome: CaseOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConformanceReport {
    pub cases: Vec<CaseResult>,
}

impl ConformanceReport {
    pub fn passed(&self) -> usize {
        self.count(|o| matches!(o, CaseOutcome::Passed))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, CaseOutcome::Failed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, CaseOutcome::Skipped))
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseResult> {
        self.cases
            .iter()
            .filter(|c| matches!(c.outcome, CaseOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&CaseOutcome) -> bool) -> usize {
        self.cases.iter().filter(|c| pred(&c.outcome)).count()
    }
}

/// Run every fixture of every policy, in declaration order.
pub fn run_conformance(set: &PolicySet) -> ConformanceReport {
    let mut report = ConformanceReport::default();
    for policy in set.policies() {
        if policy.tests.is_empty() {
            report.cases.push(CaseResult {
                policy_id: policy.id.clone(),
                test: "no tests defined".to_string(),
                outcome: CaseOutcome::Skipped,
                verdict: None,
            });
            continue;
        }
        for test in &policy.tests {
            report.cases.push(run_case(policy, test));
        }
    }
    debug!(
        passed = report.passed(),
        failed = report.failed(),
        skipped = report.skipped(),
        "conformance run finished"
    );
    report
}

fn run_case(policy: &Policy, test: &ConformanceTest) -> CaseResult {
    let verdict = evaluate(policy, &test.request);
    let mut mismatches = Vec::new();

    if verdict.allowed != test.expected.allowed {
        mismatches.push(format!(
            "expected allowed={}, got allowed={}",
            test.expected.allowed, verdict.allowed
        ));
    }
    if let Some(pattern) = &test.expected.reason {
        if !verdict.reason_matches(pattern) {
            mismatches.push(format!(
                "reason '{}' does not match /{}/i",
                verdict.reason, pattern
            ));
        }
    }

    let outcome = if mismatches.is_empty() {
        CaseOutcome::Passed
    } else {
        CaseOutcome::Failed {
            mismatch: mismatches.join("; "),
        }
    };

    CaseResult {
        policy_id: policy.id.clone(),
        test: test.name.clone(),
        outcome,
        verdict: Some(verdict),
    }
}
