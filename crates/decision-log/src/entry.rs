use serde::{Deserialize, Serialize};

/// A single decision log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionEntry {
    pub id: uuid::Uuid,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub event_type: DecisionEventType,
    pub source: DecisionSource,
    pub details: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<VerdictRecord>,
}

impl DecisionEntry {
    /// New entry with a fresh UUID v4 and the current UTC time.
    pub fn new(
        event_type: DecisionEventType,
        source: DecisionSource,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            event_type,
            source,
            details,
            verdict: None,
        }
    }

    pub fn with_verdict(mut self, verdict: VerdictRecord) -> Self {
        self.verdict = Some(verdict);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionEventType {
    PolicySetLoaded,
    VerdictIssued,
    ConformanceRun,
}

/// Which command produced the entry, and against which policy file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionSource {
    pub component: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_file: Option<String>,
}

impl DecisionSource {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            policy_file: None,
        }
    }

    pub fn with_policy_file(mut self, path: impl Into<String>) -> Self {
        self.policy_file = Some(path.into());
        self
    }
}

/// The outcome of an evaluation, flattened for the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictRecord {
    pub tool: String,
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
    pub reason: String,
}
