//! Gemini `generateContent` decision policy.
//!
//! The transcript is replayed as Gemini contents on every step: tool
//! requests become `functionCall` parts, tool results and declined approvals
//! become `functionResponse` parts. The first function call in the reply is
//! turned into a tool request; otherwise the reply text is the answer.

use super::action::{Action, ToolCallRequest};
use super::gemini_types::{
    Content, GeminiFunctionCall, GeminiFunctionDeclaration, GeminiFunctionResponse, GeminiTool,
    GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
};
use super::policy::{DecisionPolicy, PolicyFuture};
use super::prompt::build_system_prompt;
use crate::config::AgentConfig;
use crate::error::LlmError;
use crate::tools::{ToolArguments, ToolDescriptor};
use crate::transcript::{ToolOutcome, Turn, TurnPayload};
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

const PROVIDER: &str = "gemini";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_OUTPUT_TOKENS: u32 = 8192;

pub struct GeminiPolicy {
    api_key: String,
    api_base: String,
    model: String,
    temperature: f64,
    system_prompt: String,
    tools: Vec<ToolDescriptor>,
    client: Client,
}

impl std::fmt::Debug for GeminiPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiPolicy")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("tools", &self.tools.len())
            .finish_non_exhaustive()
    }
}

impl GeminiPolicy {
    /// Build a policy for the given tools.
    ///
    /// Key priority: `agent.api_key`, then `GEMINI_API_KEY`, then
    /// `GOOGLE_API_KEY`.
    pub fn new(config: &AgentConfig, tools: Vec<ToolDescriptor>) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| LlmError::Auth {
                provider: PROVIDER.into(),
            })?;

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| request_error(&e.to_string()))?;

        Ok(Self {
            api_key,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            system_prompt: build_system_prompt(&tools),
            tools,
            client,
        })
    }

    fn model_name(&self) -> String {
        if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        }
    }

    fn build_request(&self, transcript: &[Turn]) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: transcript_to_contents(transcript),
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part::text(self.system_prompt.clone())],
            }),
            tools: build_gemini_tools(&self.tools),
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        }
    }

    async fn call_api(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, LlmError> {
        let url = format!("{}/{}:generateContent", self.api_base, self.model_name());
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| request_error(&e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Auth {
                    provider: PROVIDER.into(),
                },
                StatusCode::NOT_FOUND => LlmError::ModelNotFound {
                    provider: PROVIDER.into(),
                    model: self.model.clone(),
                },
                _ => request_error(&format!("{status}: {body}")),
            });
        }

        let result: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| request_error(&format!("malformed response: {e}")))?;
        if let Some(err) = result.error.as_ref() {
            return Err(request_error(&err.message));
        }
        Ok(result)
    }
}

impl DecisionPolicy for GeminiPolicy {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn step<'a>(&'a self, transcript: &'a [Turn]) -> PolicyFuture<'a> {
        Box::pin(async move {
            let request = self.build_request(transcript);
            tracing::debug!(
                model = %self.model,
                contents = request.contents.len(),
                "requesting gemini decision"
            );
            let response = self.call_api(&request).await?;
            response_to_action(response)
        })
    }
}

fn request_error(message: &str) -> LlmError {
    LlmError::Request {
        provider: PROVIDER.into(),
        message: message.to_string(),
    }
}

fn build_gemini_tools(tools: &[ToolDescriptor]) -> Option<Vec<GeminiTool>> {
    if tools.is_empty() {
        return None;
    }
    let function_declarations = tools
        .iter()
        .map(|tool| GeminiFunctionDeclaration {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: (!tool.input_schema.fields.is_empty())
                .then(|| tool.input_schema.to_json_schema()),
        })
        .collect();
    Some(vec![GeminiTool {
        function_declarations,
    }])
}

/// Replay the transcript as Gemini contents, merging consecutive parts that
/// share a role.
fn transcript_to_contents(transcript: &[Turn]) -> Vec<Content> {
    let tool_names: HashMap<Uuid, &str> = transcript
        .iter()
        .filter_map(|turn| match &turn.payload {
            TurnPayload::ToolRequest { request, .. } => {
                Some((request.request_id, request.tool_name.as_str()))
            }
            _ => None,
        })
        .collect();

    let mut contents: Vec<Content> = Vec::new();
    for turn in transcript {
        let Some((role, part)) = turn_to_part(&turn.payload, &tool_names) else {
            continue;
        };
        match contents.last_mut() {
            Some(last) if last.role.as_deref() == Some(role) => last.parts.push(part),
            _ => contents.push(Content {
                role: Some(role.to_string()),
                parts: vec![part],
            }),
        }
    }
    contents
}

fn turn_to_part(
    payload: &TurnPayload,
    tool_names: &HashMap<Uuid, &str>,
) -> Option<(&'static str, Part)> {
    match payload {
        TurnPayload::UserMessage { text } => Some(("user", Part::text(text.clone()))),
        TurnPayload::AgentMessage { text } => Some(("model", Part::text(text.clone()))),
        TurnPayload::ToolRequest { request, .. } => Some((
            "model",
            Part::function_call(GeminiFunctionCall {
                name: request.tool_name.clone(),
                args: Value::Object(request.arguments.clone()),
                id: None,
            }),
        )),
        TurnPayload::ToolResult {
            tool_name, outcome, ..
        } => {
            let response = match outcome {
                ToolOutcome::Success { output } => json!({
                    "status": "success",
                    "content": output.structured.clone().unwrap_or_else(|| json!(output.content)),
                }),
                ToolOutcome::Failure { error } => json!({
                    "status": "error",
                    "kind": error.kind,
                    "message": error.message,
                }),
            };
            Some((
                "user",
                Part::function_response(GeminiFunctionResponse {
                    name: tool_name.clone(),
                    response,
                }),
            ))
        }
        TurnPayload::ApprovalDecision(decision) if decision.outcome.is_declined() => {
            let name = tool_names
                .get(&decision.request_id)
                .copied()
                .unwrap_or("tool");
            Some((
                "user",
                Part::function_response(GeminiFunctionResponse {
                    name: name.to_string(),
                    response: json!({
                        "status": "declined",
                        "outcome": decision.outcome,
                        "decided_by": decision.decided_by,
                        "reason": decision.reason,
                    }),
                }),
            ))
        }
        // An approval is followed by the tool result, which carries the data.
        TurnPayload::ApprovalDecision(_) => None,
    }
}

fn response_to_action(response: GenerateContentResponse) -> Result<Action, LlmError> {
    let parts = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts)
        .unwrap_or_default();

    if let Some(call) = parts.iter().find_map(|part| part.function_call.as_ref()) {
        return Ok(Action::RequestTool(ToolCallRequest::new(
            call.name.clone(),
            call_arguments(&call.args),
        )));
    }

    let text = parts
        .iter()
        .filter_map(|part| part.text.as_deref())
        .collect::<Vec<_>>()
        .join("");
    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse {
            provider: PROVIDER.into(),
        });
    }
    Ok(Action::Respond(text))
}

/// Function-call arguments as a map. Whole-valued floats become integers,
/// since integer fields may arrive as `5.0`.
fn call_arguments(args: &Value) -> ToolArguments {
    match args {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| (key.clone(), normalize_number(value)))
            .collect(),
        Value::Null => Map::new(),
        other => {
            let mut wrapped = Map::new();
            wrapped.insert("input".to_string(), other.clone());
            wrapped
        }
    }
}

fn normalize_number(value: &Value) -> Value {
    if let Some(float) = value.as_f64()
        && !value.is_i64()
        && !value.is_u64()
        && float.fract() == 0.0
        && float.abs() < 9.0e15
    {
        #[allow(clippy::cast_possible_truncation)]
        return json!(float as i64);
    }
    value.clone()
}
