use std::sync::Arc;

use hostwarden::agent::{Action, AgentLoop, DecisionPolicy, GeminiPolicy, LoopOutcome};
use hostwarden::approval::ApprovalGate;
use hostwarden::config::AgentConfig;
use hostwarden::error::LlmError;
use hostwarden::tools::{Tool, ToolDescriptor};
use hostwarden::transcript::{TranscriptStore, TurnKind, TurnPayload};
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::agent_harness::{CountingTool, registry};

const GENERATE_PATH: &str = "/models/gemini-2.5-flash:generateContent";

fn config(server: &MockServer) -> AgentConfig {
    AgentConfig {
        api_key: Some("test-key".into()),
        api_base: server.uri(),
        ..AgentConfig::default()
    }
}

fn function_call(name: &str, args: Value) -> Value {
    json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{"functionCall": {"name": name, "args": args}}]
            }
        }]
    })
}

fn text_reply(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]}
        }]
    })
}

fn descriptors(tools: &[Arc<CountingTool>]) -> Vec<ToolDescriptor> {
    tools.iter().map(|tool| tool.descriptor().clone()).collect()
}

async fn user_transcript(text: &str) -> TranscriptStore {
    let transcript = TranscriptStore::new("gemini-test");
    transcript.append(TurnPayload::user(text)).await;
    transcript
}

#[tokio::test]
async fn function_call_becomes_tool_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{"role": "user", "parts": [{"text": "kill pid 4242"}]}],
            "tools": [{"functionDeclarations": [{"name": "kill_process"}]}]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(function_call("kill_process", json!({"pid": 4242.0}))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let tools = [CountingTool::mutating("kill_process")];
    let policy = GeminiPolicy::new(&config(&server), descriptors(&tools)).unwrap();
    let transcript = user_transcript("kill pid 4242").await;

    let action = policy.step(&transcript.snapshot().await).await.unwrap();

    let Action::RequestTool(request) = action else {
        panic!("expected a tool request, got {action:?}");
    };
    assert_eq!(request.tool_name, "kill_process");
    assert_eq!(request.arguments["pid"], json!(4242));
}

#[tokio::test]
async fn request_carries_system_instruction() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("ok")))
        .mount(&server)
        .await;

    let policy = GeminiPolicy::new(&config(&server), Vec::new()).unwrap();
    let transcript = user_transcript("hello").await;
    policy.step(&transcript.snapshot().await).await.unwrap();

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let body: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert!(body["systemInstruction"]["parts"][0]["text"].is_string());
    assert!(body.get("tools").is_none());
}

#[tokio::test]
async fn text_reply_becomes_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(text_reply("Port 22 is open to the world.")),
        )
        .mount(&server)
        .await;

    let policy = GeminiPolicy::new(&config(&server), Vec::new()).unwrap();
    let transcript = user_transcript("anything exposed?").await;

    let action = policy.step(&transcript.snapshot().await).await.unwrap();

    assert_eq!(action, Action::Respond("Port 22 is open to the world.".into()));
}

#[tokio::test]
async fn unauthorized_maps_to_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let policy = GeminiPolicy::new(&config(&server), Vec::new()).unwrap();
    let transcript = user_transcript("hello").await;

    let err = policy.step(&transcript.snapshot().await).await.unwrap_err();
    assert!(matches!(err, LlmError::Auth { .. }));
}

#[tokio::test]
async fn missing_model_maps_to_model_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let policy = GeminiPolicy::new(&config(&server), Vec::new()).unwrap();
    let transcript = user_transcript("hello").await;

    let err = policy.step(&transcript.snapshot().await).await.unwrap_err();
    let LlmError::ModelNotFound { model, .. } = err else {
        panic!("expected ModelNotFound, got {err:?}");
    };
    assert_eq!(model, "gemini-2.5-flash");
}

#[tokio::test]
async fn empty_candidates_are_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&server)
        .await;

    let policy = GeminiPolicy::new(&config(&server), Vec::new()).unwrap();
    let transcript = user_transcript("hello").await;

    let err = policy.step(&transcript.snapshot().await).await.unwrap_err();
    assert!(matches!(err, LlmError::EmptyResponse { .. }));
}

#[tokio::test]
async fn loop_runs_read_only_tool_then_answers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(function_call("list_processes", json!({}))),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(body_partial_json(json!({
            "contents": [
                {"role": "user"},
                {"role": "model", "parts": [{"functionCall": {"name": "list_processes"}}]},
                {"role": "user", "parts": [{"functionResponse": {"name": "list_processes"}}]}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("All quiet.")))
        .mount(&server)
        .await;

    let processes = CountingTool::read_only("list_processes");
    let tools = [processes.clone()];
    let policy = GeminiPolicy::new(&config(&server), descriptors(&tools)).unwrap();
    let agent = AgentLoop::new(Arc::new(policy), registry(&tools), 10);
    let transcript = user_transcript("what is running?").await;
    let gate = ApprovalGate::new();

    let outcome = agent.run(&transcript, &gate).await;

    assert_eq!(outcome, LoopOutcome::Responded);
    assert_eq!(processes.calls(), 1);
    let kinds: Vec<TurnKind> = transcript.snapshot().await.iter().map(|t| t.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            TurnKind::UserMessage,
            TurnKind::ToolRequest,
            TurnKind::ToolResult,
            TurnKind::AgentMessage,
        ]
    );
}
