//! Records as served by a DashClaw-style policy API.

use std::fmt;

use guardrail_engine::Parameters;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::NormalizeError;

/// One foreign policy record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name; also the source of a derived id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `0`/`false` marks the record inactive. Missing means active.
    #[serde(default = "default_active", deserialize_with = "decode_active")]
    pub active: bool,
    pub policy_type: String,
    /// Category-specific configuration. Accepts an object or a JSON-encoded
    /// string holding one.
    #[serde(default, deserialize_with = "decode_rules")]
    pub rules: Parameters,
}

fn default_active() -> bool {
    true
}

fn decode_active<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(true),
        Value::Bool(flag) => Ok(flag),
        Value::Number(n) => Ok(n.as_f64().map_or(true, |v| v != 0.0)),
        other => Err(de::Error::custom(format!(
            "active must be a boolean or number, got {other}"
        ))),
    }
}

fn decode_rules<'de, D>(deserializer: D) -> Result<Parameters, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Parameters::new()),
        Value::Object(map) => Ok(map),
        Value::String(encoded) => serde_json::from_str::<Parameters>(&encoded)
            .map_err(|e| de::Error::custom(format!("rules string is not a JSON object: {e}"))),
        other => Err(de::Error::custom(format!(
            "rules must be an object or JSON string, got {other}"
        ))),
    }
}

/// Parse a foreign document: either a bare array of records or an object with
/// a `policies` array.
pub fn parse_foreign_document(json: &str) -> Result<Vec<ForeignPolicy>, NormalizeError> {
    let value: Value = serde_json::from_str(json).map_err(NormalizeError::Json)?;
    let records = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("policies") {
            Some(Value::Array(items)) => items,
            _ => return Err(NormalizeError::MissingPolicies),
        },
        _ => return Err(NormalizeError::MissingPolicies),
    };

    records
        .into_iter()
        .enumerate()
        .map(|(position, record)| {
            serde_json::from_value(record)
                .map_err(|source| NormalizeError::MalformedRecord { position, source })
        })
        .collect()
}

/// Foreign policy categories this crate knows by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForeignCategory {
    RequireApproval,
    BlockActionType,
    RiskThreshold,
    RateLimit,
    WebhookCheck,
    BehavioralAnomaly,
    SemanticCheck,
    Other(String),
}

impl ForeignCategory {
    pub fn parse(policy_type: &str) -> Self {
        match policy_type {
            "require_approval" => Self::RequireApproval,
            "block_action_type" => Self::BlockActionType,
            "risk_threshold" => Self::RiskThreshold,
            "rate_limit" => Self::RateLimit,
            "webhook_check" => Self::WebhookCheck,
            "behavioral_anomaly" => Self::BehavioralAnomaly,
            "semantic_check" => Self::SemanticCheck,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::RequireApproval => "require_approval",
            Self::BlockActionType => "block_action_type",
            Self::RiskThreshold => "risk_threshold",
            Self::RateLimit => "rate_limit",
            Self::WebhookCheck => "webhook_check",
            Self::BehavioralAnomaly => "behavioral_anomaly",
            Self::SemanticCheck => "semantic_check",
            Self::Other(name) => name,
        }
    }

    /// Categories with a direct canonical equivalent.
    pub fn is_native(&self) -> bool {
        matches!(self, Self::RequireApproval | Self::BlockActionType)
    }
}

impl fmt::Display for ForeignCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
