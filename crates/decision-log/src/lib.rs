//! Append-only JSON-lines decision log.
//!
//! Each [`DecisionEntry`] is serialised as one newline-terminated JSON object,
//! producing a [JSON Lines](https://jsonlines.org/) stream that can be tailed,
//! shipped or replayed.
//!
//! ```rust,no_run
//! use decision_log::{DecisionEntry, DecisionEventType, DecisionSource, DecisionWriter};
//!
//! # fn example() -> Result<(), decision_log::DecisionLogError> {
//! let mut writer = DecisionWriter::open("/var/log/guardrailgen/decisions.jsonl")?;
//! writer.write(&DecisionEntry::new(
//!     DecisionEventType::PolicySetLoaded,
//!     DecisionSource::new("validate").with_policy_file("policies.yaml"),
//!     serde_json::json!({"policies": 3}),
//! ))?;
//! # Ok(())
//! # }
//! ```

pub mod entry;
pub mod writer;

pub use entry::{DecisionEntry, DecisionEventType, DecisionSource, VerdictRecord};
pub use writer::{DecisionLogError, DecisionWriter};
