//! # guardrail-engine
//!
//! Deterministic decisions for agent tool calls. A [`PolicySet`] is an ordered
//! list of guardrails, each scoped to tool-name patterns and carrying exactly
//! one rule: block (with an optional exact-name allowlist), require approval,
//! or an opaque foreign rule that enforces the conservative mode it maps to.
//!
//! [`evaluate`] decides one policy; [`evaluate_all`] and [`PolicyEngine`] run a
//! set in order with deny-overrides semantics. All validation happens when a
//! set is built, so evaluation is infallible.
//!
//! ## Quick start
//!
//! ```rust
//! use guardrail_engine::{loader, ActionRequest, PolicyEngine};
//!
//! let set = loader::load_policy_set_from_str(r#"
//! version: 1
//! policies:
//!   - id: no_deletes
//!     applies_to: { tools: ["fs.delete"] }
//!     rule: { block: true }
//! "#).unwrap();
//! let engine = PolicyEngine::new(set);
//! let verdict = engine.evaluate(&ActionRequest::new("fs.delete"));
//! assert!(!verdict.allowed);
//! ```

mod conformance;
mod decision;
mod error;
mod evaluator;
pub mod loader;
pub mod matcher;
mod request;
mod schema;

// Re-export primary public API at crate root.
pub use conformance::{run_conformance, CaseOutcome, CaseResult, ConformanceReport};
pub use decision::{Reason, Verdict};
pub use error::{SchemaError, SUPPORTED_VERSION};
pub use evaluator::{evaluate, evaluate_all, EvaluationTrace, PolicyEngine};
pub use matcher::ToolPattern;
pub use request::ActionRequest;
pub use schema::{
    AppliesTo, ConformanceTest, EnforcedMode, Expectation, Parameters, Policy, PolicyDocument,
    PolicySet, Rule,
};
