//! pytest target. Like the Jest target, verdicts come from `guardrailgen probe`.

use std::fmt::Write;
use std::path::PathBuf;

use guardrail_engine::{ConformanceTest, PolicySet};

use crate::compiler::{
    banner, group_cases, quoted, to_json, Artifact, CompileError, CompileOptions, GeneratedFile,
    GroupCases, TargetLanguage, SKIPPED_CASE_NAME,
};
use crate::ident::{self, Scope};

const TEST_FILE: &str = "test_guardrails.py";

const PRELUDE: &str = r#"
import json
import os
import re
import subprocess

import pytest

"#;

const HELPERS: &str = r#"

def evaluate_policy(policy, request):
    completed = subprocess.run(
        [GUARDRAILGEN_BIN, "probe"],
        input=json.dumps({"policy": policy, "input": request}),
        capture_output=True,
        text=True,
        check=True,
    )
    return json.loads(completed.stdout)


def reason_matches(pattern, reason):
    try:
        return re.search(pattern, reason, re.IGNORECASE) is not None
    except re.error:
        return pattern.lower() in reason.lower()
"#;

pub(crate) fn render(set: &PolicySet, options: &CompileOptions) -> Result<Artifact, CompileError> {
    let mut out = banner("#", set, TargetLanguage::Pytest);
    out.push_str(PRELUDE);
    writeln!(
        out,
        "GUARDRAILGEN_BIN = os.environ.get(\"GUARDRAILGEN_BIN\", {})",
        quoted(&options.cli_binary)
    )?;
    out.push_str(HELPERS);

    let mut classes = Scope::default();
    for policy in set.policies() {
        let class = classes.claim(format!("Test_{}", ident::snake(&policy.id)));
        let policy_json = to_json(&policy.id, policy)?;

        writeln!(out)?;
        writeln!(out)?;
        writeln!(out, "class {class}:")?;
        writeln!(out, "    {}", quoted(&format!("guardrails: {}", policy.id)))?;
        writeln!(out)?;
        writeln!(out, "    policy = json.loads({})", quoted(&policy_json))?;

        match group_cases(policy) {
            GroupCases::Skipped => {
                writeln!(out)?;
                writeln!(out, "    @pytest.mark.skip(reason={})", quoted(SKIPPED_CASE_NAME))?;
                writeln!(out, "    def test_{}(self):", ident::snake(SKIPPED_CASE_NAME))?;
                writeln!(out, "        pass")?;
            }
            GroupCases::Tests(tests) => {
                let mut methods = Scope::default();
                for test in tests {
                    let method = methods.claim(format!("test_{}", ident::snake(&test.name)));
                    render_case(&mut out, &policy.id, &method, test)?;
                }
            }
        }
    }

    Ok(Artifact {
        target: TargetLanguage::Pytest,
        test_module: GeneratedFile {
            path: PathBuf::from(TEST_FILE),
            contents: out,
        },
        build_descriptor: GeneratedFile {
            path: PathBuf::from("requirements.txt"),
            contents: "pytest>=7.4.0\n".to_string(),
        },
    })
}

fn render_case(
    out: &mut String,
    policy_id: &str,
    method: &str,
    test: &ConformanceTest,
) -> Result<(), CompileError> {
    let request_json = to_json(policy_id, &test.request)?;

    writeln!(out)?;
    writeln!(out, "    def {method}(self):")?;
    writeln!(out, "        {}", quoted(&test.name))?;
    writeln!(
        out,
        "        result = evaluate_policy(self.policy, json.loads({}))",
        quoted(&request_json)
    )?;
    let expected = if test.expected.allowed { "True" } else { "False" };
    writeln!(out, "        assert result[\"allowed\"] is {expected}, result")?;
    if let Some(pattern) = &test.expected.reason {
        writeln!(
            out,
            "        assert reason_matches({}, result[\"reason\"]), result",
            quoted(pattern)
        )?;
    }
    Ok(())
}
