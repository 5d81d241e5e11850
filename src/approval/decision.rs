use crate::tools::ToolArguments;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest argument summary shown to the approver.
const MAX_SUMMARY_CHARS: usize = 200;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DecisionOutcome {
    Approved,
    Denied,
    Expired,
}

impl DecisionOutcome {
    /// Denied and expired requests never run their tool.
    pub fn is_declined(self) -> bool {
        !matches!(self, Self::Approved)
    }
}

/// The one decision recorded for a mutating tool request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalDecision {
    pub request_id: Uuid,
    pub outcome: DecisionOutcome,
    /// Who decided: a user identity, `timeout`, or `session-closed`.
    pub decided_by: String,
    pub decided_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ApprovalDecision {
    pub fn new(
        request_id: Uuid,
        outcome: DecisionOutcome,
        decided_by: impl Into<String>,
        reason: Option<String>,
    ) -> Self {
        Self {
            request_id,
            outcome,
            decided_by: decided_by.into(),
            decided_at: Utc::now(),
            reason,
        }
    }
}

/// One-line rendering of tool arguments for approval prompts.
#[must_use]
pub fn summarize_args(arguments: &ToolArguments) -> String {
    if arguments.is_empty() {
        return "(no arguments)".to_string();
    }
    let raw = serde_json::to_string(arguments).unwrap_or_default();
    if raw.chars().count() <= MAX_SUMMARY_CHARS {
        return raw;
    }
    let mut summary: String = raw.chars().take(MAX_SUMMARY_CHARS).collect();
    summary.push('…');
    summary
}
