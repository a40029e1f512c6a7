use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, SUPPORTED_VERSION};
use crate::matcher::ToolPattern;
use crate::request::ActionRequest;

/// Opaque string-keyed parameters (request args, context, foreign rule config).
pub type Parameters = serde_json::Map<String, serde_json::Value>;

/// The canonical policy document as it appears on disk.
///
/// This is the unvalidated shape; convert it into a [`PolicySet`] before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    /// Schema version; must be 1.
    pub version: u64,
    /// Optional project label carried into generated artifacts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Policies in evaluation order.
    pub policies: Vec<Policy>,
}

/// A validated, ordered set of policies.
///
/// Only constructible through [`PolicySet::new`] or conversion from a
/// [`PolicyDocument`], both of which run every schema check. Once built the set
/// is read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DocumentEnvelope", into = "PolicyDocument")]
pub struct PolicySet {
    project: Option<String>,
    policies: Vec<Policy>,
}

impl PolicySet {
    /// Validate `policies` and build a set.
    pub fn new(project: Option<String>, policies: Vec<Policy>) -> Result<Self, SchemaError> {
        let mut seen = HashSet::new();
        for (position, policy) in policies.iter().enumerate() {
            policy.validate(position)?;
            if !seen.insert(policy.id.as_str()) {
                return Err(SchemaError::DuplicateId {
                    id: policy.id.clone(),
                });
            }
        }
        Ok(Self { project, policies })
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    pub fn get(&self, id: &str) -> Option<&Policy> {
        self.policies.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl TryFrom<PolicyDocument> for PolicySet {
    type Error = SchemaError;

    fn try_from(doc: PolicyDocument) -> Result<Self, Self::Error> {
        // Version gate runs before any policy is looked at.
        if doc.version != SUPPORTED_VERSION {
            return Err(SchemaError::UnsupportedVersion { found: doc.version });
        }
        Self::new(doc.project, doc.policies)
    }
}

/// A document read only as far as its version. Policies stay raw until the
/// version gate has passed, so a foreign-version document is rejected on its
/// version whatever shape its policies have.
#[derive(Debug, Deserialize)]
pub(crate) struct DocumentEnvelope {
    version: u64,
    #[serde(default)]
    project: Option<String>,
    policies: Vec<serde_json::Value>,
}

impl TryFrom<DocumentEnvelope> for PolicySet {
    type Error = SchemaError;

    fn try_from(envelope: DocumentEnvelope) -> Result<Self, Self::Error> {
        if envelope.version != SUPPORTED_VERSION {
            return Err(SchemaError::UnsupportedVersion {
                found: envelope.version,
            });
        }
        let policies = envelope
            .policies
            .into_iter()
            .enumerate()
            .map(|(position, raw)| {
                serde_json::from_value::<Policy>(raw).map_err(|err| {
                    SchemaError::MalformedPolicy {
                        position,
                        reason: err.to_string(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(envelope.project, policies)
    }
}

impl From<PolicySet> for PolicyDocument {
    fn from(set: PolicySet) -> Self {
        Self {
            version: SUPPORTED_VERSION,
            project: set.project,
            policies: set.policies,
        }
    }
}

/// A single guardrail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// Unique, non-empty identifier within the set.
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub applies_to: AppliesTo,
    pub rule: Rule,
    /// Fixtures used for documentation and generated regression tests.
    #[serde(default)]
    pub tests: Vec<ConformanceTest>,
}

impl Policy {
    fn validate(&self, position: usize) -> Result<(), SchemaError> {
        if self.id.trim().is_empty() {
            return Err(SchemaError::EmptyId { position });
        }
        if self.applies_to.tools.is_empty() {
            return Err(SchemaError::EmptyScope {
                policy: self.id.clone(),
            });
        }
        for pattern in &self.applies_to.tools {
            pattern
                .check()
                .map_err(|reason| SchemaError::InvalidPattern {
                    policy: self.id.clone(),
                    pattern: pattern.to_string(),
                    reason,
                })?;
        }
        self.rule.validate().map_err(|reason| SchemaError::InvalidRule {
            policy: self.id.clone(),
            reason,
        })?;
        for (index, test) in self.tests.iter().enumerate() {
            test.validate().map_err(|reason| SchemaError::InvalidTest {
                policy: self.id.clone(),
                index,
                reason,
            })?;
        }
        Ok(())
    }
}

/// The scope of a policy: which tool names it governs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliesTo {
    pub tools: Vec<ToolPattern>,
}

impl AppliesTo {
    pub fn new<I, P>(tools: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<ToolPattern>,
    {
        Self {
            tools: tools.into_iter().map(Into::into).collect(),
        }
    }

    /// True if any pattern matches `tool`.
    pub fn covers(&self, tool: &str) -> bool {
        self.tools.iter().any(|p| p.matches(tool))
    }
}

/// The single active mode of a policy.
///
/// On disk a rule is written `{block: true, allowlist: [..]}`,
/// `{require: approval}`, or either of those plus an `opaque` section for
/// foreign categories that are carried but not executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RuleWire", into = "RuleWire")]
pub enum Rule {
    /// Deny unless the tool is named exactly in the allowlist.
    Block { allowlist: Option<Vec<String>> },
    /// Deny unless the request carries approval.
    RequireApproval,
    /// A foreign category with no native semantics. Evaluates exactly as its
    /// `enforce` mode; `kind` and `parameters` are provenance only.
    Opaque {
        kind: String,
        parameters: Parameters,
        enforce: EnforcedMode,
    },
}

/// The known mode an [`Rule::Opaque`] rule falls back to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcedMode {
    #[default]
    Block,
    RequireApproval,
}

impl Rule {
    pub fn block() -> Self {
        Rule::Block { allowlist: None }
    }

    pub fn block_with_allowlist<I, S>(tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Rule::Block {
            allowlist: Some(tools.into_iter().map(Into::into).collect()),
        }
    }

    /// Opaque provenance wrapped around the conservative `Block` mode.
    pub fn opaque(kind: impl Into<String>, parameters: Parameters) -> Self {
        Rule::Opaque {
            kind: kind.into(),
            parameters,
            enforce: EnforcedMode::Block,
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Rule::Block {
                allowlist: Some(list),
            } if list.iter().any(|t| t.trim().is_empty()) => {
                Err("allowlist entries must be non-empty tool names".to_string())
            }
            Rule::Opaque { kind, .. } if kind.trim().is_empty() => {
                Err("opaque rule kind must not be empty".to_string())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RuleWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    block: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    require: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    allowlist: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    opaque: Option<OpaqueWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpaqueWire {
    kind: String,
    #[serde(default)]
    parameters: Parameters,
}

const APPROVAL: &str = "approval";

impl TryFrom<RuleWire> for Rule {
    type Error = String;

    fn try_from(wire: RuleWire) -> Result<Self, Self::Error> {
        let blocks = wire.block == Some(true);
        let requires_approval = match wire.require.as_deref() {
            None => false,
            Some(APPROVAL) => true,
            Some(other) => {
                return Err(format!(
                    "unsupported requirement '{other}'; only 'approval' is supported"
                ))
            }
        };

        let mode = match (blocks, requires_approval) {
            (true, false) => EnforcedMode::Block,
            (false, true) => EnforcedMode::RequireApproval,
            (true, true) => {
                return Err("rule sets both `block: true` and `require: approval`".to_string())
            }
            (false, false) => {
                return Err(
                    "rule must set exactly one of `block: true` or `require: approval`"
                        .to_string(),
                )
            }
        };

        if wire.allowlist.is_some() && (mode != EnforcedMode::Block || wire.opaque.is_some()) {
            return Err("allowlist is only valid on a plain block rule".to_string());
        }

        Ok(match (wire.opaque, mode) {
            (Some(opaque), enforce) => Rule::Opaque {
                kind: opaque.kind,
                parameters: opaque.parameters,
                enforce,
            },
            (None, EnforcedMode::Block) => Rule::Block {
                allowlist: wire.allowlist,
            },
            (None, EnforcedMode::RequireApproval) => Rule::RequireApproval,
        })
    }
}

impl From<Rule> for RuleWire {
    fn from(rule: Rule) -> Self {
        let mode = |enforce: EnforcedMode| match enforce {
            EnforcedMode::Block => (Some(true), None),
            EnforcedMode::RequireApproval => (None, Some(APPROVAL.to_string())),
        };
        match rule {
            Rule::Block { allowlist } => RuleWire {
                block: Some(true),
                allowlist,
                ..RuleWire::default()
            },
            Rule::RequireApproval => RuleWire {
                require: Some(APPROVAL.to_string()),
                ..RuleWire::default()
            },
            Rule::Opaque {
                kind,
                parameters,
                enforce,
            } => {
                let (block, require) = mode(enforce);
                RuleWire {
                    block,
                    require,
                    allowlist: None,
                    opaque: Some(OpaqueWire { kind, parameters }),
                }
            }
        }
    }
}

/// A fixture attached to a policy: a request and the verdict it must produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConformanceTest {
    pub name: String,
    #[serde(rename = "input")]
    pub request: ActionRequest,
    #[serde(rename = "expect")]
    pub expected: Expectation,
}

impl ConformanceTest {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("test name must not be empty".to_string());
        }
        if self.request.tool.is_empty() {
            return Err(format!("test '{}' has an empty input.tool", self.name));
        }
        Ok(())
    }
}

/// The expected outcome of a [`ConformanceTest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expectation {
    pub allowed: bool,
    /// Pattern the verdict's reason must match, case-insensitively.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
