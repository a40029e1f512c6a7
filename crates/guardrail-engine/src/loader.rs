use std::path::Path;

use anyhow::{Context, Result};

use crate::schema::{DocumentEnvelope, PolicySet};

/// Load a [`PolicySet`] from a YAML (or JSON) file on disk.
///
/// Validates the document after deserialization (version gate, ids, scopes,
/// patterns, rules, fixtures).
pub fn load_policy_set(path: impl AsRef<Path>) -> Result<PolicySet> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read policy file: {}", path.display()))?;
    load_policy_set_from_str(&contents)
        .with_context(|| format!("invalid policy file: {}", path.display()))
}

/// Parse and validate a [`PolicySet`] from YAML text. JSON input also works.
pub fn load_policy_set_from_str(text: &str) -> Result<PolicySet> {
    let envelope: DocumentEnvelope =
        serde_yml::from_str(text).context("policy document deserialization failed")?;
    let set = PolicySet::try_from(envelope)?;
    Ok(set)
}

/// Render a policy set back into canonical YAML.
pub fn to_yaml(set: &PolicySet) -> Result<String> {
    serde_yml::to_string(set).context("failed to serialize policy set")
}
