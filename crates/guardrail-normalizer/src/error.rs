use guardrail_engine::SchemaError;
use thiserror::Error;

/// Why a foreign policy set could not be normalized.
///
/// Every variant aborts the whole set; no partial output is produced.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("foreign document is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("foreign document must be an array of policies or an object with a `policies` array")]
    MissingPolicies,

    #[error("foreign policy at position {position} is malformed: {source}")]
    MalformedRecord {
        position: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("foreign policy at position {position} has neither an id nor a name")]
    MissingIdentity { position: usize },

    #[error("foreign policy '{policy}' has an empty policy_type")]
    MissingPolicyType { policy: String },

    #[error("policy '{policy}': rules.action_types must be a non-empty array of tool names")]
    InvalidScope { policy: String },

    #[error("policy '{policy}': rules.tests must be an array")]
    TestsNotArray { policy: String },

    #[error("policy '{policy}': embedded test #{index} is malformed: {source}")]
    MalformedFixture {
        policy: String,
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}
