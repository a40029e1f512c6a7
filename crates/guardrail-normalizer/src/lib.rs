//! # guardrail-normalizer
//!
//! Translates foreign (DashClaw-style) policy records into a canonical
//! [`PolicySet`](guardrail_engine::PolicySet).
//!
//! Categories with a native equivalent map directly. Everything else becomes a
//! `Block` rule carrying the original category and parameters as opaque
//! provenance, so nothing is dropped and nothing is silently allowed. Records
//! without fixtures get a minimal synthesized pair.
//!
//! ```rust
//! use guardrail_normalizer::{normalize, parse_foreign_document};
//!
//! let records = parse_foreign_document(
//!     r#"[{"name": "Rate limit", "policy_type": "rate_limit", "rules": {"max_actions": 10}, "active": 1}]"#,
//! ).unwrap();
//! let set = normalize(&records, "demo").unwrap();
//! assert_eq!(set.policies()[0].id, "rate_limit");
//! ```

mod error;
pub mod foreign;
mod normalizer;
mod placeholder;

pub use error::NormalizeError;
pub use foreign::{parse_foreign_document, ForeignCategory, ForeignPolicy};
pub use normalizer::{normalize, slugify};
pub use placeholder::synthesize as synthesize_placeholder_tests;
