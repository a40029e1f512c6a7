use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace};

use crate::decision::{Reason, Verdict};
use crate::request::ActionRequest;
use crate::schema::{EnforcedMode, Policy, PolicySet, Rule};

// ---------------------------------------------------------------------------
// Rule matcher
// ---------------------------------------------------------------------------

/// Decide a single policy against a request.
///
/// Pure function of its inputs. A policy whose scope does not cover the
/// request's tool yields an unattributed allow.
pub fn evaluate(policy: &Policy, request: &ActionRequest) -> Verdict {
    if !policy.applies_to.covers(&request.tool) {
        return Verdict::allow_default(Reason::PolicyDoesNotApply);
    }

    match &policy.rule {
        Rule::Block { allowlist } => {
            let allowlisted = allowlist
                .as_ref()
                .is_some_and(|list| list.iter().any(|t| *t == request.tool));
            if allowlisted {
                Verdict::allow(&policy.id, Reason::Allowlisted)
            } else {
                Verdict::deny(&policy.id, Reason::BlockedByPolicy)
            }
        }
        Rule::RequireApproval => approval_verdict(policy, request),
        Rule::Opaque { enforce, .. } => match enforce {
            EnforcedMode::Block => Verdict::deny(&policy.id, Reason::BlockedByPolicy),
            EnforcedMode::RequireApproval => approval_verdict(policy, request),
        },
    }
}

fn approval_verdict(policy: &Policy, request: &ActionRequest) -> Verdict {
    if request.is_approved() {
        Verdict::allow(&policy.id, Reason::Approved)
    } else {
        Verdict::deny(&policy.id, Reason::ApprovalRequired)
    }
}

// ---------------------------------------------------------------------------
// Decision aggregator
// ---------------------------------------------------------------------------

/// Run `policies` in order; the first denial wins (deny-overrides).
pub fn evaluate_all(policies: &[Policy], request: &ActionRequest) -> Verdict {
    for policy in policies {
        let verdict = evaluate(policy, request);
        if !verdict.allowed {
            return verdict;
        }
    }
    Verdict::allow_default(Reason::AllPoliciesPassed)
}

/// Every per-policy verdict consulted for one request, up to and including the
/// one that decided it.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationTrace {
    pub verdict: Verdict,
    pub consulted: Vec<Verdict>,
}

// ---------------------------------------------------------------------------
// PolicyEngine
// ---------------------------------------------------------------------------

/// A validated policy set ready to answer requests.
///
/// Cheap to clone; clones share the same immutable set, so one engine can be
/// handed to any number of callers.
#[derive(Clone)]
pub struct PolicyEngine {
    set: Arc<PolicySet>,
}

impl std::fmt::Debug for PolicyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyEngine")
            .field("project", &self.set.project())
            .field("num_policies", &self.set.len())
            .finish()
    }
}

impl PolicyEngine {
    pub fn new(set: PolicySet) -> Self {
        Self { set: Arc::new(set) }
    }

    pub fn policy_set(&self) -> &PolicySet {
        &self.set
    }

    pub fn evaluate(&self, request: &ActionRequest) -> Verdict {
        debug!(tool = %request.tool, "evaluating request against policy set");
        let verdict = evaluate_all(self.set.policies(), request);
        if let Some(id) = &verdict.policy_id {
            trace!(policy = %id, reason = %verdict.reason, "policy denied request");
        }
        verdict
    }

    /// Like [`PolicyEngine::evaluate`], also returning the verdict of every
    /// policy consulted before the decision.
    pub fn evaluate_traced(&self, request: &ActionRequest) -> EvaluationTrace {
        let mut consulted = Vec::new();
        for policy in self.set.policies() {
            let verdict = evaluate(policy, request);
            trace!(policy = %policy.id, allowed = verdict.allowed, reason = %verdict.reason, "policy consulted");
            let denied = !verdict.allowed;
            consulted.push(verdict.clone());
            if denied {
                return EvaluationTrace { verdict, consulted };
            }
        }
        EvaluationTrace {
            verdict: Verdict::allow_default(Reason::AllPoliciesPassed),
            consulted,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
