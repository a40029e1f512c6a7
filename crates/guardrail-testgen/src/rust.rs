//! Cargo test target. Each policy becomes a module whose tests deserialize the
//! embedded policy and call `guardrail_engine::evaluate` on it.

use std::fmt::Write;
use std::path::PathBuf;

use guardrail_engine::{ConformanceTest, PolicySet};

use crate::compiler::{
    banner, group_cases, indent_tail, to_json, to_json_pretty, Artifact, CompileError,
    CompileOptions, GeneratedFile, GroupCases, TargetLanguage, SKIPPED_CASE_NAME,
};
use crate::ident::{self, Scope};

const TEST_FILE: &str = "guardrails.rs";

const PRELUDE: &str = r#"
#![allow(unused_imports, dead_code, clippy::bool_assert_comparison)]

fn policy_from(json: &str) -> ::guardrail_engine::Policy {
    ::serde_json::from_str(json).expect("embedded policy should deserialize")
}

fn request_from(json: &str) -> ::guardrail_engine::ActionRequest {
    ::serde_json::from_str(json).expect("embedded request should deserialize")
}
"#;

pub(crate) fn render(set: &PolicySet, options: &CompileOptions) -> Result<Artifact, CompileError> {
    let mut out = banner("//", set, TargetLanguage::Rust);
    out.push_str(PRELUDE);

    let mut modules = Scope::default();
    for policy in set.policies() {
        let module = modules.claim(ident::rust(&policy.id));
        let policy_json = to_json_pretty(&policy.id, policy)?;

        writeln!(out)?;
        writeln!(out, "// guardrails: {:?}", policy.id)?;
        writeln!(out, "mod {module} {{")?;
        writeln!(
            out,
            "    const POLICY: &str = {};",
            raw_string(&indent_tail(&policy_json, "    "))
        )?;

        match group_cases(policy) {
            GroupCases::Skipped => {
                writeln!(out)?;
                writeln!(out, "    #[test]")?;
                writeln!(out, "    #[ignore = {SKIPPED_CASE_NAME:?}]")?;
                writeln!(out, "    fn {}() {{}}", ident::rust(SKIPPED_CASE_NAME))?;
            }
            GroupCases::Tests(tests) => {
                let mut names = Scope::default();
                for test in tests {
                    let name = names.claim(ident::rust(&test.name));
                    render_case(&mut out, &policy.id, &name, test)?;
                }
            }
        }
        writeln!(out, "}}")?;
    }

    Ok(Artifact {
        target: TargetLanguage::Rust,
        test_module: GeneratedFile {
            path: PathBuf::from(TEST_FILE),
            contents: out,
        },
        build_descriptor: cargo_manifest(set, options)?,
    })
}

fn render_case(
    out: &mut String,
    policy_id: &str,
    fn_name: &str,
    test: &ConformanceTest,
) -> Result<(), CompileError> {
    let request_json = to_json(policy_id, &test.request)?;

    writeln!(out)?;
    writeln!(out, "    // {:?}", test.name)?;
    writeln!(out, "    #[test]")?;
    writeln!(out, "    fn {fn_name}() {{")?;
    // Full paths: a case may share its name with any helper.
    writeln!(out, "        let policy = super::policy_from(POLICY);")?;
    writeln!(
        out,
        "        let request = super::request_from({});",
        raw_string(&request_json)
    )?;
    writeln!(out, "        let verdict = ::guardrail_engine::evaluate(&policy, &request);")?;
    writeln!(
        out,
        "        assert_eq!(verdict.allowed, {}, \"unexpected verdict: {{:?}}\", verdict);",
        test.expected.allowed
    )?;
    if let Some(pattern) = &test.expected.reason {
        writeln!(out, "        assert!(")?;
        writeln!(out, "            verdict.reason_matches({pattern:?}),")?;
        writeln!(out, "            \"reason '{{}}' does not match /{{}}/i\",")?;
        writeln!(out, "            verdict.reason,")?;
        writeln!(out, "            {pattern:?}")?;
        writeln!(out, "        );")?;
    }
    writeln!(out, "    }}")?;
    Ok(())
}

fn cargo_manifest(set: &PolicySet, options: &CompileOptions) -> Result<GeneratedFile, CompileError> {
    let mut manifest = String::new();
    writeln!(manifest, "[package]")?;
    writeln!(manifest, "name = \"{}\"", ident::package_name(set.project()))?;
    writeln!(manifest, "version = \"0.1.0\"")?;
    writeln!(manifest, "edition = \"2021\"")?;
    writeln!(manifest, "publish = false")?;
    writeln!(manifest)?;
    writeln!(manifest, "[lib]")?;
    writeln!(manifest, "path = \"{TEST_FILE}\"")?;
    writeln!(manifest)?;
    writeln!(manifest, "[dependencies]")?;
    writeln!(manifest, "guardrail-engine = {}", options.engine_dependency)?;
    writeln!(manifest, "serde_json = \"1\"")?;
    Ok(GeneratedFile {
        path: PathBuf::from("Cargo.toml"),
        contents: manifest,
    })
}

/// A raw string literal fenced with enough `#` to hold `text` verbatim.
fn raw_string(text: &str) -> String {
    let mut hashes = 1;
    while text.contains(&format!("\"{}", "#".repeat(hashes))) {
        hashes += 1;
    }
    let fence = "#".repeat(hashes);
    format!("r{fence}\"{text}\"{fence}")
}
