use thiserror::Error;

/// The only canonical document version this engine accepts.
pub const SUPPORTED_VERSION: u64 = 1;

/// A malformed or version-mismatched policy document.
///
/// Raised once, at [`PolicySet`](crate::PolicySet) construction. Evaluation
/// never produces one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("unsupported policy version {found}; only version {SUPPORTED_VERSION} is supported")]
    UnsupportedVersion { found: u64 },

    #[error("policy at position {position} is malformed: {reason}")]
    MalformedPolicy { position: usize, reason: String },

    #[error("policy at position {position} has an empty id")]
    EmptyId { position: usize },

    #[error("duplicate policy id '{id}'")]
    DuplicateId { id: String },

    #[error("policy '{policy}': applies_to.tools requires at least one pattern")]
    EmptyScope { policy: String },

    #[error("policy '{policy}': invalid tool pattern '{pattern}': {reason}")]
    InvalidPattern {
        policy: String,
        pattern: String,
        reason: String,
    },

    #[error("policy '{policy}': invalid rule: {reason}")]
    InvalidRule { policy: String, reason: String },

    #[error("policy '{policy}': test #{index} is invalid: {reason}")]
    InvalidTest {
        policy: String,
        index: usize,
        reason: String,
    },
}
