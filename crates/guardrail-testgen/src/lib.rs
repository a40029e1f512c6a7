//! # guardrail-testgen
//!
//! Compiles a [`PolicySet`](guardrail_engine::PolicySet) into a runnable
//! regression suite: one group per policy, one case per fixture.
//!
//! | target | test module            | build descriptor   |
//! |--------|------------------------|--------------------|
//! | `rust` | `guardrails.rs`        | `Cargo.toml`       |
//! | `js`   | `guardrails.test.js`   | `package.json`     |
//! | `py`   | `test_guardrails.py`   | `requirements.txt` |
//!
//! The Rust suite links `guardrail-engine` directly. The Jest and pytest
//! suites shell out to `guardrailgen probe`, so every target is judged by the
//! same evaluator.

mod compiler;
mod ident;
mod jest;
mod pytest;
mod rust;

pub use compiler::{
    compile, Artifact, CompileError, CompileOptions, GeneratedFile, TargetLanguage,
};
