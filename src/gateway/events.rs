use crate::agent::LoopOutcome;
use crate::session::ApprovalHandling;
use crate::transcript::Turn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages a WebSocket client sends.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    UserMessage {
        text: String,
    },
    ApprovalResponse {
        request_id: Uuid,
        approve: bool,
    },
    Ping,
}

/// Messages the gateway pushes to a WebSocket client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected { session_id: String },
    Turn { turn: Turn },
    Outcome { outcome: LoopOutcome },
    Approval { handling: ApprovalHandling },
    Error { message: String },
    Pong,
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|error| {
            format!(r#"{{"type":"error","message":"serialization failed: {error}"}}"#)
        })
    }
}
