use serde::{Deserialize, Serialize};

use crate::schema::Parameters;

/// One candidate tool invocation submitted for a decision.
///
/// `args` is carried for fixtures and host logging only; no rule inspects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// The action identifier, e.g. `email.send`.
    pub tool: String,
    #[serde(default)]
    pub args: Parameters,
    /// Explicit proof of approval attached by the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval: Option<bool>,
    /// Free-form host context. An `approved: true` entry counts as approval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Parameters>,
}

impl ActionRequest {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            args: Parameters::new(),
            approval: None,
            context: None,
        }
    }

    pub fn with_approval(mut self, approval: bool) -> Self {
        self.approval = Some(approval);
        self
    }

    pub fn with_context(mut self, context: Parameters) -> Self {
        self.context = Some(context);
        self
    }

    /// `approval == true` or `context.approved == true`. Anything else,
    /// including a truthy non-boolean `approved`, is not approval.
    pub fn is_approved(&self) -> bool {
        self.approval == Some(true)
            || self
                .context
                .as_ref()
                .and_then(|ctx| ctx.get("approved"))
                .and_then(|v| v.as_bool())
                == Some(true)
    }
}
