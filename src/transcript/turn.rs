use crate::agent::ToolCallRequest;
use crate::approval::ApprovalDecision;
use crate::tools::{ToolError, ToolOutput};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TurnKind {
    UserMessage,
    AgentMessage,
    ToolRequest,
    ToolResult,
    ApprovalDecision,
}

/// Result of one tool invocation as recorded in the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success { output: ToolOutput },
    Failure { error: ToolError },
}

impl From<Result<ToolOutput, ToolError>> for ToolOutcome {
    fn from(result: Result<ToolOutput, ToolError>) -> Self {
        match result {
            Ok(output) => Self::Success { output },
            Err(error) => Self::Failure { error },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnPayload {
    UserMessage {
        text: String,
    },
    AgentMessage {
        text: String,
    },
    ToolRequest {
        request: ToolCallRequest,
        mutating: bool,
    },
    ToolResult {
        request_id: Uuid,
        tool_name: String,
        outcome: ToolOutcome,
    },
    ApprovalDecision(ApprovalDecision),
}

impl TurnPayload {
    pub fn kind(&self) -> TurnKind {
        match self {
            Self::UserMessage { .. } => TurnKind::UserMessage,
            Self::AgentMessage { .. } => TurnKind::AgentMessage,
            Self::ToolRequest { .. } => TurnKind::ToolRequest,
            Self::ToolResult { .. } => TurnKind::ToolResult,
            Self::ApprovalDecision(_) => TurnKind::ApprovalDecision,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::UserMessage { text: text.into() }
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self::AgentMessage { text: text.into() }
    }

    pub fn tool_result(
        request: &ToolCallRequest,
        result: Result<ToolOutput, ToolError>,
    ) -> Self {
        Self::ToolResult {
            request_id: request.request_id,
            tool_name: request.tool_name.clone(),
            outcome: result.into(),
        }
    }
}

/// One immutable record of a session's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: TurnPayload,
}

impl Turn {
    pub fn kind(&self) -> TurnKind {
        self.payload.kind()
    }
}
