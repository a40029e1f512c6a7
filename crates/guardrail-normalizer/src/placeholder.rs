//! Minimal fixtures for foreign policies that ship none of their own.

use guardrail_engine::{ActionRequest, ConformanceTest, EnforcedMode, Expectation, Rule, ToolPattern};

const APPROVAL_FALLBACK_TOOL: &str = "external_send";
const BLOCK_FALLBACK_TOOL: &str = "destructive";
const OPAQUE_FALLBACK_TOOL: &str = "example_tool";

/// Stand-in text for each `*` when instantiating a scoped wildcard.
const WILDCARD_FILL: &str = "example";

/// Fixtures appropriate to `rule`, invoking a tool that is guaranteed to fall
/// inside `scope`.
pub fn synthesize(rule: &Rule, scope: &[ToolPattern]) -> Vec<ConformanceTest> {
    match rule {
        Rule::RequireApproval => approval_pair(scoped_tool(scope, APPROVAL_FALLBACK_TOOL)),
        Rule::Block { .. } => vec![denial(
            "blocks_action_type",
            scoped_tool(scope, BLOCK_FALLBACK_TOOL),
        )],
        Rule::Opaque {
            enforce: EnforcedMode::Block,
            ..
        } => vec![denial(
            "placeholder_test",
            scoped_tool(scope, OPAQUE_FALLBACK_TOOL),
        )],
        Rule::Opaque {
            enforce: EnforcedMode::RequireApproval,
            ..
        } => approval_pair(scoped_tool(scope, OPAQUE_FALLBACK_TOOL)),
    }
}

/// The first scoped pattern as a concrete tool name. An unrestricted scope
/// yields `fallback`; any other wildcard is filled in so it still matches.
fn scoped_tool(scope: &[ToolPattern], fallback: &str) -> String {
    let Some(first) = scope.first() else {
        return fallback.to_string();
    };
    if !first.is_wildcard() {
        return first.as_str().to_string();
    }
    if first.as_str().chars().all(|c| c == '*') {
        return fallback.to_string();
    }
    first.as_str().replace('*', WILDCARD_FILL)
}

fn approval_pair(tool: String) -> Vec<ConformanceTest> {
    vec![
        ConformanceTest {
            name: "blocks_without_approval".to_string(),
            request: ActionRequest::new(tool.clone()).with_approval(false),
            expected: Expectation {
                allowed: false,
                reason: None,
            },
        },
        ConformanceTest {
            name: "allows_with_approval".to_string(),
            request: ActionRequest::new(tool).with_approval(true),
            expected: Expectation {
                allowed: true,
                reason: None,
            },
        },
    ]
}

fn denial(name: &str, tool: String) -> ConformanceTest {
    ConformanceTest {
        name: name.to_string(),
        request: ActionRequest::new(tool),
        expected: Expectation {
            allowed: false,
            reason: None,
        },
    }
}
