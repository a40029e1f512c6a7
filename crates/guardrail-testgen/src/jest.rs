//! Jest target. Verdicts come from `guardrailgen probe`, so the suite shares
//! one evaluator with every other target.

use std::fmt::Write;
use std::path::PathBuf;

use guardrail_engine::{ConformanceTest, PolicySet};
use serde_json::json;

use crate::compiler::{
    banner, group_cases, indent_tail, quoted, to_json, to_json_pretty, Artifact, CompileError,
    CompileOptions, GeneratedFile, GroupCases, TargetLanguage, SKIPPED_CASE_NAME,
};
use crate::ident;

const TEST_FILE: &str = "guardrails.test.js";

const HELPERS: &str = r#"
function reasonMatches(pattern, reason) {
  try {
    return new RegExp(pattern, "i").test(reason);
  } catch (err) {
    if (!(err instanceof SyntaxError)) throw err;
    return reason.toLowerCase().includes(pattern.toLowerCase());
  }
}
"#;

pub(crate) fn render(set: &PolicySet, options: &CompileOptions) -> Result<Artifact, CompileError> {
    let mut out = banner("//", set, TargetLanguage::Jest);
    writeln!(out)?;
    writeln!(out, "import {{ execFileSync }} from \"node:child_process\";")?;
    writeln!(out)?;
    writeln!(
        out,
        "const GUARDRAILGEN_BIN = process.env.GUARDRAILGEN_BIN || {};",
        quoted(&options.cli_binary)
    )?;
    writeln!(out)?;
    writeln!(out, "function evaluatePolicy(policy, input) {{")?;
    writeln!(out, "  const stdout = execFileSync(GUARDRAILGEN_BIN, [\"probe\"], {{")?;
    writeln!(out, "    input: JSON.stringify({{ policy, input }}),")?;
    writeln!(out, "    encoding: \"utf8\",")?;
    writeln!(out, "  }});")?;
    writeln!(out, "  return JSON.parse(stdout);")?;
    writeln!(out, "}}")?;
    out.push_str(HELPERS);

    for policy in set.policies() {
        let policy_json = to_json_pretty(&policy.id, policy)?;

        writeln!(out)?;
        writeln!(out, "describe({}, () => {{", quoted(&format!("guardrails: {}", policy.id)))?;
        writeln!(out, "  const policy = {};", indent_tail(&policy_json, "  "))?;

        match group_cases(policy) {
            GroupCases::Skipped => {
                writeln!(out)?;
                writeln!(out, "  test.skip({}, () => {{}});", quoted(SKIPPED_CASE_NAME))?;
            }
            GroupCases::Tests(tests) => {
                for test in tests {
                    render_case(&mut out, &policy.id, test)?;
                }
            }
        }
        writeln!(out, "}});")?;
    }

    Ok(Artifact {
        target: TargetLanguage::Jest,
        test_module: GeneratedFile {
            path: PathBuf::from(TEST_FILE),
            contents: out,
        },
        build_descriptor: package_json(set)?,
    })
}

fn render_case(out: &mut String, policy_id: &str, test: &ConformanceTest) -> Result<(), CompileError> {
    let input = to_json(policy_id, &test.request)?;

    writeln!(out)?;
    writeln!(out, "  test({}, () => {{", quoted(&test.name))?;
    writeln!(out, "    const result = evaluatePolicy(policy, {input});")?;
    writeln!(out, "    expect(result.allowed).toBe({});", test.expected.allowed)?;
    if let Some(pattern) = &test.expected.reason {
        writeln!(
            out,
            "    expect(reasonMatches({}, result.reason)).toBe(true);",
            quoted(pattern)
        )?;
    }
    writeln!(out, "  }});")?;
    Ok(())
}

fn package_json(set: &PolicySet) -> Result<GeneratedFile, CompileError> {
    let manifest = json!({
        "name": ident::package_name(set.project()),
        "version": "0.1.0",
        "private": true,
        "type": "module",
        "scripts": {
            "test": "node --experimental-vm-modules node_modules/jest/bin/jest.js"
        },
        "devDependencies": {
            "jest": "^29.7.0"
        },
        "jest": {
            "testEnvironment": "node",
            "transform": {}
        }
    });
    let mut contents = serde_json::to_string_pretty(&manifest).map_err(CompileError::Descriptor)?;
    contents.push('\n');
    Ok(GeneratedFile {
        path: PathBuf::from("package.json"),
        contents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use guardrail_engine::{ActionRequest, AppliesTo, Expectation, Policy, Rule};

    fn policy(id: &str, tests: Vec<ConformanceTest>) -> Policy {
        Policy {
            id: id.to_string(),
            description: String::new(),
            applies_to: AppliesTo::new(["exec", "shell.*"]),
            rule: Rule::block(),
            tests,
        }
    }

    fn demo_set() -> PolicySet {
        let tests = vec![
            ConformanceTest {
                name: "blocks exec".to_string(),
                request: ActionRequest::new("exec"),
                expected: Expectation {
                    allowed: false,
                    reason: Some("blocked".to_string()),
                },
            },
            ConformanceTest {
                name: "ignores \"other\" tools".to_string(),
                request: ActionRequest::new("read"),
                expected: Expectation {
                    allowed: true,
                    reason: None,
                },
            },
        ];
        PolicySet::new(
            Some("demo".to_string()),
            vec![policy("block_shell", tests), policy("untested", Vec::new())],
        )
        .unwrap()
    }

    #[test]
    fn describe_block_per_policy() {
        let artifact = render(&demo_set(), &CompileOptions::default()).unwrap();
        let code = &artifact.test_module.contents;

        assert_eq!(artifact.test_module.path, PathBuf::from("guardrails.test.js"));
        assert!(code.starts_with("// Auto-generated guardrails tests for: demo\n"));
        assert!(code.contains("describe(\"guardrails: block_shell\", () => {"));
        assert!(code.contains("describe(\"guardrails: untested\", () => {"));
        assert_eq!(code.matches("describe(").count(), 2);
    }

    #[test]
    fn cases_call_the_cli() {
        let artifact = render(&demo_set(), &CompileOptions::default()).unwrap();
        let code = &artifact.test_module.contents;

        assert!(code.contains("process.env.GUARDRAILGEN_BIN || \"guardrailgen\""));
        assert!(code.contains("[\"probe\"]"));
        assert!(code.contains("test(\"blocks exec\", () => {"));
        assert!(code.contains("test(\"ignores \\\"other\\\" tools\", () => {"));
        assert!(code.contains("expect(result.allowed).toBe(false);"));
        assert!(code.contains("expect(reasonMatches(\"blocked\", result.reason)).toBe(true);"));
        assert_eq!(code.matches("reasonMatches(\"").count(), 1);
    }

    #[test]
    fn invalid_reason_pattern_falls_back_to_substring() {
        let tests = vec![ConformanceTest {
            name: "unbalanced pattern".to_string(),
            request: ActionRequest::new("exec"),
            expected: Expectation {
                allowed: false,
                reason: Some("blocked (".to_string()),
            },
        }];
        let set = PolicySet::new(None, vec![policy("broken_regex", tests)]).unwrap();
        let artifact = render(&set, &CompileOptions::default()).unwrap();
        let code = &artifact.test_module.contents;

        // The pattern never reaches a bare RegExp constructor inside a case.
        assert!(code.contains("expect(reasonMatches(\"blocked (\", result.reason)).toBe(true);"));
        assert_eq!(code.matches("new RegExp(").count(), 1);
        let helper = code.split("function reasonMatches(pattern, reason) {").nth(1).unwrap();
        assert!(helper.contains("} catch (err) {"));
        assert!(helper.contains("reason.toLowerCase().includes(pattern.toLowerCase())"));
    }

    #[test]
    fn untested_policy_is_skipped() {
        let artifact = render(&demo_set(), &CompileOptions::default()).unwrap();
        let code = &artifact.test_module.contents;
        let group = code.split("describe(\"guardrails: untested\"").nth(1).unwrap();
        assert!(group.contains("test.skip(\"no tests defined\", () => {});"));
    }

    #[test]
    fn package_json_is_valid() {
        let artifact = render(&demo_set(), &CompileOptions::default()).unwrap();
        let manifest: serde_json::Value =
            serde_json::from_str(&artifact.build_descriptor.contents).unwrap();
        assert_eq!(manifest["name"], "demo-guardrails-tests");
        assert_eq!(manifest["type"], "module");
        assert_eq!(manifest["devDependencies"]["jest"], "^29.7.0");
    }
}
