use crate::tools::ToolArguments;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A request by the agent to run one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub request_id: Uuid,
    pub tool_name: String,
    #[serde(default)]
    pub arguments: ToolArguments,
}

impl ToolCallRequest {
    /// New request with a fresh v4 request id.
    pub fn new(tool_name: impl Into<String>, arguments: ToolArguments) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// The single decision produced by one policy step.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Respond(String),
    RequestTool(ToolCallRequest),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_request_gets_a_distinct_id() {
        let a = ToolCallRequest::new("get_os_info", ToolArguments::new());
        let b = ToolCallRequest::new("get_os_info", ToolArguments::new());
        assert_ne!(a.request_id, b.request_id);
    }

    #[test]
    fn missing_arguments_deserialize_as_empty() {
        let request: ToolCallRequest = serde_json::from_str(
            r#"{"request_id":"6f1c2b1e-8a4e-4f5e-9a51-7f2d7b0d9c11","tool_name":"get_os_info"}"#,
        )
        .unwrap();
        assert!(request.arguments.is_empty());
    }
}
