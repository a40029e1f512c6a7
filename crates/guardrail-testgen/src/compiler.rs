use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use guardrail_engine::{ConformanceTest, Policy, PolicySet};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::{jest, pytest, rust};

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to serialize policy '{policy}' for embedding: {source}")]
    Embed {
        policy: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to render build descriptor: {0}")]
    Descriptor(#[source] serde_json::Error),

    #[error("failed to format generated source")]
    Format(#[from] std::fmt::Error),
}

/// The language a compiled suite is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetLanguage {
    /// Cargo integration test calling `guardrail_engine::evaluate` directly.
    Rust,
    /// Jest suite; verdicts come from the `probe` subcommand.
    Jest,
    /// pytest suite; verdicts come from the `probe` subcommand.
    Pytest,
}

impl TargetLanguage {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetLanguage::Rust => "rust",
            TargetLanguage::Jest => "js",
            TargetLanguage::Pytest => "py",
        }
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rust" | "rs" => Ok(TargetLanguage::Rust),
            "js" | "jest" | "javascript" => Ok(TargetLanguage::Jest),
            "py" | "pytest" | "python" => Ok(TargetLanguage::Pytest),
            other => Err(format!("unknown target language '{other}' (expected rust, js or py)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Right-hand side of the `guardrail-engine` entry in a generated
    /// `Cargo.toml`, e.g. `"0.1"` or `{ path = "../crates/guardrail-engine" }`.
    pub engine_dependency: String,
    /// Default CLI binary generated Jest/pytest suites invoke for verdicts.
    /// Overridable at test time with `GUARDRAILGEN_BIN`.
    pub cli_binary: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            engine_dependency: format!("\"{}\"", env!("CARGO_PKG_VERSION")),
            cli_binary: "guardrailgen".to_string(),
        }
    }
}

/// A file to be written, relative to the chosen output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub contents: String,
}

/// A compiled suite: the test module plus the descriptor needed to run it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub target: TargetLanguage,
    pub test_module: GeneratedFile,
    pub build_descriptor: GeneratedFile,
}

impl Artifact {
    pub fn files(&self) -> [&GeneratedFile; 2] {
        [&self.test_module, &self.build_descriptor]
    }
}

/// Compile `set` into a test suite for `target`.
///
/// Emits one group per policy, in order. A policy without fixtures gets a
/// single skipped case so no group is ever assertion-free.
pub fn compile(
    set: &PolicySet,
    target: TargetLanguage,
    options: &CompileOptions,
) -> Result<Artifact, CompileError> {
    let artifact = match target {
        TargetLanguage::Rust => rust::render(set, options)?,
        TargetLanguage::Jest => jest::render(set, options)?,
        TargetLanguage::Pytest => pytest::render(set, options)?,
    };
    info!(
        target = %target,
        groups = set.len(),
        file = %artifact.test_module.path.display(),
        "compiled guardrail test suite"
    );
    Ok(artifact)
}

// ---------------------------------------------------------------------------
// Helpers shared by the renderers
// ---------------------------------------------------------------------------

/// What a policy's group contains.
pub(crate) enum GroupCases<'a> {
    Tests(&'a [ConformanceTest]),
    /// No fixtures: render a single explicitly skipped case.
    Skipped,
}

pub(crate) fn group_cases(policy: &Policy) -> GroupCases<'_> {
    if policy.tests.is_empty() {
        GroupCases::Skipped
    } else {
        GroupCases::Tests(&policy.tests)
    }
}

pub(crate) const SKIPPED_CASE_NAME: &str = "no tests defined";

pub(crate) fn banner(comment: &str, set: &PolicySet, target: TargetLanguage) -> String {
    format!(
        "{comment} Auto-generated guardrails tests for: {project}\n\
         {comment} DO NOT EDIT - regenerate with: guardrailgen generate --lang {target}\n",
        project = set.project().unwrap_or("unknown"),
    )
}

pub(crate) fn to_json<T: Serialize>(policy_id: &str, value: &T) -> Result<String, CompileError> {
    serde_json::to_string(value).map_err(|source| CompileError::Embed {
        policy: policy_id.to_string(),
        source,
    })
}

pub(crate) fn to_json_pretty<T: Serialize>(
    policy_id: &str,
    value: &T,
) -> Result<String, CompileError> {
    serde_json::to_string_pretty(value).map_err(|source| CompileError::Embed {
        policy: policy_id.to_string(),
        source,
    })
}

/// Quote `text` as a JSON string literal, which is also a valid JS and Python
/// string literal.
pub(crate) fn quoted(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

/// Indent every line after the first by `pad`.
pub(crate) fn indent_tail(text: &str, pad: &str) -> String {
    text.replace('\n', &format!("\n{pad}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_target_language() {
        assert_eq!("rust".parse::<TargetLanguage>(), Ok(TargetLanguage::Rust));
        assert_eq!("JS".parse::<TargetLanguage>(), Ok(TargetLanguage::Jest));
        assert_eq!("pytest".parse::<TargetLanguage>(), Ok(TargetLanguage::Pytest));
        assert!("cobol".parse::<TargetLanguage>().is_err());
    }

    #[test]
    fn every_target_emits_a_module_and_descriptor() {
        let set = PolicySet::new(
            Some("demo".to_string()),
            vec![Policy {
                id: "block_exec".to_string(),
                description: String::new(),
                applies_to: guardrail_engine::AppliesTo::new(["exec"]),
                rule: guardrail_engine::Rule::block(),
                tests: Vec::new(),
            }],
        )
        .unwrap();

        let expected = [
            (TargetLanguage::Rust, "guardrails.rs", "Cargo.toml"),
            (TargetLanguage::Jest, "guardrails.test.js", "package.json"),
            (TargetLanguage::Pytest, "test_guardrails.py", "requirements.txt"),
        ];
        for (target, module, descriptor) in expected {
            let artifact = compile(&set, target, &CompileOptions::default()).unwrap();
            assert_eq!(artifact.target, target);
            let paths: Vec<_> = artifact.files().iter().map(|f| f.path.clone()).collect();
            assert_eq!(paths, vec![PathBuf::from(module), PathBuf::from(descriptor)]);
            assert!(artifact
                .test_module
                .contents
                .contains(&format!("regenerate with: guardrailgen generate --lang {target}")));
        }
    }

    #[test]
    fn quoting_escapes() {
        assert_eq!(quoted("say \"hi\"\n"), r#""say \"hi\"\n""#);
    }

    #[test]
    fn indent_only_tail_lines() {
        assert_eq!(indent_tail("{\n  \"a\": 1\n}", "  "), "{\n    \"a\": 1\n  }");
    }
}
