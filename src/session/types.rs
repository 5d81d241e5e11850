use crate::agent::LoopOutcome;
use crate::approval::PendingApproval;
use crate::config::ApprovalConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Per-session approval behaviour, resolved from `[approval]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub approval_timeout: Duration,
    pub resume_after_decline: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&ApprovalConfig::default())
    }
}

impl From<&ApprovalConfig> for SessionSettings {
    fn from(config: &ApprovalConfig) -> Self {
        Self {
            approval_timeout: config.timeout(),
            resume_after_decline: config.resume_after_decline,
        }
    }
}

/// What happened to an approval response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ApprovalHandling {
    /// The decision applied and the agent loop ran afterwards.
    Applied { outcome: LoopOutcome },
    /// The decision applied; the loop was not resumed after a decline.
    Recorded,
    /// The request was unknown or already decided.
    Ignored,
}

/// Summary of a live session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub turns: usize,
    pub pending: Vec<PendingApproval>,
}
