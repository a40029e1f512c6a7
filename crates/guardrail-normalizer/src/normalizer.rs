use guardrail_engine::{AppliesTo, ConformanceTest, Parameters, Policy, PolicySet, Rule, ToolPattern};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::NormalizeError;
use crate::foreign::{ForeignCategory, ForeignPolicy};
use crate::placeholder;

/// Scope used when a foreign category does not restrict by tool.
const UNIVERSAL_PATTERN: &str = "*";

/// Convert foreign records into a validated canonical [`PolicySet`].
///
/// Inactive records are dropped before conversion. Any malformed record aborts
/// the whole set.
pub fn normalize(
    foreign: &[ForeignPolicy],
    project_name: &str,
) -> Result<PolicySet, NormalizeError> {
    let mut policies = Vec::with_capacity(foreign.len());
    for (position, record) in foreign.iter().enumerate() {
        if !record.active {
            debug!(position, policy_type = %record.policy_type, "skipping inactive foreign policy");
            continue;
        }
        policies.push(convert(position, record)?);
    }

    let set = PolicySet::new(Some(project_name.to_string()), policies)?;
    info!(
        project = project_name,
        received = foreign.len(),
        normalized = set.len(),
        "foreign policies normalized"
    );
    Ok(set)
}

fn convert(position: usize, record: &ForeignPolicy) -> Result<Policy, NormalizeError> {
    let id = derive_id(position, record)?;
    if record.policy_type.trim().is_empty() {
        return Err(NormalizeError::MissingPolicyType { policy: id });
    }

    let category = ForeignCategory::parse(&record.policy_type);
    let tools = scope(&id, &category, &record.rules)?;
    let rule = map_rule(&category, &record.rules);
    if !category.is_native() {
        warn!(
            policy = %id,
            category = %category,
            "foreign category has no native rule; enforcing as block with opaque provenance"
        );
    }

    let tests = match record.rules.get("tests") {
        None | Some(Value::Null) => placeholder::synthesize(&rule, &tools),
        Some(Value::Array(items)) => embedded_tests(&id, items)?,
        Some(_) => return Err(NormalizeError::TestsNotArray { policy: id }),
    };

    Ok(Policy {
        description: record.name.clone().unwrap_or_else(|| id.clone()),
        id,
        applies_to: AppliesTo { tools },
        rule,
        tests,
    })
}

/// Explicit id if present, otherwise the slugified display name.
fn derive_id(position: usize, record: &ForeignPolicy) -> Result<String, NormalizeError> {
    if let Some(id) = record.id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        return Ok(id.to_string());
    }
    record
        .name
        .as_deref()
        .map(slugify)
        .filter(|s| !s.is_empty())
        .ok_or(NormalizeError::MissingIdentity { position })
}

/// Lowercase, with whitespace runs collapsed to single underscores.
pub fn slugify(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

fn scope(
    id: &str,
    category: &ForeignCategory,
    rules: &Parameters,
) -> Result<Vec<ToolPattern>, NormalizeError> {
    if !category.is_native() {
        return Ok(vec![ToolPattern::new(UNIVERSAL_PATTERN)]);
    }

    let invalid = || NormalizeError::InvalidScope {
        policy: id.to_string(),
    };
    match rules.get("action_types") {
        None | Some(Value::Null) => Ok(vec![ToolPattern::new(UNIVERSAL_PATTERN)]),
        Some(Value::Array(items)) if !items.is_empty() => items
            .iter()
            .map(|item| item.as_str().map(ToolPattern::new).ok_or_else(invalid))
            .collect(),
        Some(_) => Err(invalid()),
    }
}

fn map_rule(category: &ForeignCategory, rules: &Parameters) -> Rule {
    match category {
        ForeignCategory::RequireApproval => Rule::RequireApproval,
        ForeignCategory::BlockActionType => Rule::block(),
        ForeignCategory::RiskThreshold
        | ForeignCategory::RateLimit
        | ForeignCategory::WebhookCheck
        | ForeignCategory::BehavioralAnomaly
        | ForeignCategory::SemanticCheck
        | ForeignCategory::Other(_) => Rule::opaque(category.as_str(), rules.clone()),
    }
}

fn embedded_tests(id: &str, items: &[Value]) -> Result<Vec<ConformanceTest>, NormalizeError> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item.clone()).map_err(|source| {
                NormalizeError::MalformedFixture {
                    policy: id.to_string(),
                    index,
                    source,
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use guardrail_engine::{run_conformance, EnforcedMode, SchemaError};
    use serde_json::json;

    fn records(value: Value) -> Vec<ForeignPolicy> {
        serde_json::from_value(value).expect("test records should parse")
    }

    #[test]
    fn rate_limit_becomes_opaque_block() {
        let set = normalize(
            &records(json!([
                {"id": "rl", "name": "Rate limit", "policy_type": "rate_limit",
                 "rules": {"max_actions": 10}, "active": 1}
            ])),
            "demo",
        )
        .unwrap();

        let policy = &set.policies()[0];
        assert_eq!(policy.applies_to, AppliesTo::new(["*"]));
        match &policy.rule {
            Rule::Opaque {
                kind,
                parameters,
                enforce,
            } => {
                assert_eq!(kind, "rate_limit");
                assert_eq!(Value::Object(parameters.clone()), json!({"max_actions": 10}));
                assert_eq!(*enforce, EnforcedMode::Block);
            }
            other => panic!("expected opaque rule, got {other:?}"),
        }
    }

    #[test]
    fn every_unmapped_category_degrades_to_block() {
        for kind in [
            "risk_threshold",
            "rate_limit",
            "webhook_check",
            "behavioral_anomaly",
            "semantic_check",
            "brand_new_type",
        ] {
            let set = normalize(
                &records(json!([{"name": kind, "policy_type": kind, "rules": {"k": "v"}}])),
                "demo",
            )
            .unwrap();
            let rule = &set.policies()[0].rule;
            assert_eq!(rule, &Rule::opaque(kind, json!({"k": "v"}).as_object().unwrap().clone()));
        }
    }

    #[test]
    fn inactive_records_never_appear() {
        let set = normalize(
            &records(json!([
                {"id": "on", "policy_type": "block_action_type", "active": 1},
                {"id": "off", "policy_type": "block_action_type", "active": 0},
                {"id": "off_bool", "policy_type": "require_approval", "active": false},
                {"id": "default_on", "policy_type": "require_approval"}
            ])),
            "demo",
        )
        .unwrap();
        let ids: Vec<&str> = set.policies().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["on", "default_on"]);
    }

    #[test]
    fn inactive_records_are_not_validated() {
        let set = normalize(
            &records(json!([{"policy_type": "rate_limit", "active": 0}])),
            "demo",
        )
        .unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn id_is_slugified_from_name() {
        let set = normalize(
            &records(json!([
                {"name": "  Block   Shell\tCommands ", "policy_type": "block_action_type"}
            ])),
            "demo",
        )
        .unwrap();
        let policy = &set.policies()[0];
        assert_eq!(policy.id, "block_shell_commands");
        assert_eq!(policy.description, "  Block   Shell\tCommands ");
    }

    #[test]
    fn explicit_id_wins_and_description_falls_back_to_id() {
        let set = normalize(
            &records(json!([{"id": "pol_1", "policy_type": "block_action_type"}])),
            "demo",
        )
        .unwrap();
        assert_eq!(set.policies()[0].id, "pol_1");
        assert_eq!(set.policies()[0].description, "pol_1");
        assert_eq!(set.project(), Some("demo"));
    }

    #[test]
    fn missing_identity_names_position() {
        let err = normalize(
            &records(json!([
                {"id": "ok", "policy_type": "block_action_type"},
                {"policy_type": "block_action_type"}
            ])),
            "demo",
        )
        .unwrap_err();
        assert!(matches!(err, NormalizeError::MissingIdentity { position: 1 }));
        assert!(err.to_string().contains("position 1"));
    }

    #[test]
    fn action_types_scope_native_categories() {
        let set = normalize(
            &records(json!([
                {"id": "sends", "policy_type": "require_approval",
                 "rules": {"action_types": ["message.send", "email.send"]}}
            ])),
            "demo",
        )
        .unwrap();
        let policy = &set.policies()[0];
        assert_eq!(policy.rule, Rule::RequireApproval);
        assert_eq!(policy.applies_to, AppliesTo::new(["message.send", "email.send"]));
        assert_eq!(policy.tests.len(), 2);
        assert_eq!(policy.tests[0].request.tool, "message.send");
    }

    #[test]
    fn malformed_action_types_abort() {
        for bad in [json!("fs.delete"), json!([]), json!(["fs.delete", 3])] {
            let err = normalize(
                &records(json!([
                    {"id": "b", "policy_type": "block_action_type", "rules": {"action_types": bad}}
                ])),
                "demo",
            )
            .unwrap_err();
            assert!(matches!(err, NormalizeError::InvalidScope { .. }), "{err}");
        }
    }

    #[test]
    fn malformed_pattern_is_a_schema_error() {
        let err = normalize(
            &records(json!([
                {"id": "b", "policy_type": "block_action_type",
                 "rules": {"action_types": ["fs delete"]}}
            ])),
            "demo",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::Schema(SchemaError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn embedded_tests_are_copied_verbatim() {
        let set = normalize(
            &records(json!([{
                "id": "sends",
                "policy_type": "require_approval",
                "rules": {
                    "action_types": ["email.send"],
                    "tests": [{
                        "name": "context_approval",
                        "input": {"tool": "email.send", "args": {"to": "a@b.c"}, "context": {"approved": true}},
                        "expect": {"allowed": true, "reason": "approved"}
                    }]
                }
            }])),
            "demo",
        )
        .unwrap();
        let tests = &set.policies()[0].tests;
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].name, "context_approval");
        assert_eq!(tests[0].request.args["to"], "a@b.c");
        assert_eq!(tests[0].expected.reason.as_deref(), Some("approved"));
    }

    #[test]
    fn malformed_embedded_fixture_aborts() {
        let err = normalize(
            &records(json!([{
                "id": "sends",
                "policy_type": "require_approval",
                "rules": {"tests": [
                    {"name": "ok", "input": {"tool": "x"}, "expect": {"allowed": false}},
                    {"name": "no_expect", "input": {"tool": "x"}}
                ]}
            }])),
            "demo",
        )
        .unwrap_err();
        match err {
            NormalizeError::MalformedFixture { policy, index, .. } => {
                assert_eq!(policy, "sends");
                assert_eq!(index, 1);
            }
            other => panic!("expected malformed fixture, got {other}"),
        }
    }

    #[test]
    fn tests_must_be_an_array() {
        let err = normalize(
            &records(json!([
                {"id": "s", "policy_type": "require_approval", "rules": {"tests": {"name": "x"}}}
            ])),
            "demo",
        )
        .unwrap_err();
        assert!(matches!(err, NormalizeError::TestsNotArray { .. }));
    }

    #[test]
    fn duplicate_slugs_abort() {
        let err = normalize(
            &records(json!([
                {"name": "No Deletes", "policy_type": "block_action_type"},
                {"name": "no   deletes", "policy_type": "block_action_type"}
            ])),
            "demo",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::Schema(SchemaError::DuplicateId { .. })
        ));
    }

    #[test]
    fn empty_policy_type_is_rejected() {
        let err = normalize(&records(json!([{"id": "x", "policy_type": " "}])), "demo")
            .unwrap_err();
        assert!(matches!(err, NormalizeError::MissingPolicyType { .. }));
    }

    #[test]
    fn synthesized_fixtures_pass_conformance() {
        let set = normalize(
            &records(json!([
                {"id": "a", "policy_type": "require_approval", "rules": {"action_types": ["email.send"]}},
                {"id": "b", "policy_type": "block_action_type", "rules": {"action_types": ["fs.*"]}},
                {"id": "c", "policy_type": "risk_threshold", "rules": {"threshold": 80}},
                {"id": "d", "policy_type": "require_approval"}
            ])),
            "demo",
        )
        .unwrap();
        let report = run_conformance(&set);
        assert!(report.is_success(), "{:?}", report.failures().collect::<Vec<_>>());
        assert_eq!(report.skipped(), 0);
    }

    #[test]
    fn slugify_collapses_whitespace() {
        assert_eq!(slugify("Require Approval For Sends"), "require_approval_for_sends");
        assert_eq!(slugify("   "), "");
    }
}
