use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{Value, json};

use crate::agent_harness::CountingTool;
use crate::gateway_harness::GatewayTestServer;

#[tokio::test]
async fn health_reports_tools_and_sessions() {
    let server = GatewayTestServer::start(&CountingTool::mutating("kill_process")).await;
    server.create_session().await;

    let body: Value = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "ok");
    assert_eq!(body["sessions"], 1);
    assert_eq!(body["tools"], 1);
}

#[tokio::test]
async fn message_then_approval_runs_tool_once() {
    let kill = CountingTool::mutating("kill_process");
    let server = GatewayTestServer::start(&kill).await;
    let id = server.create_session().await;

    let (status, body) = server
        .post_json(
            &format!("/sessions/{id}/messages"),
            json!({"message": "stop pid 4242"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"]["status"], "awaiting_approval");
    assert_eq!(body["pending"][0]["request"]["tool_name"], "kill_process");
    let request_id = body["outcome"]["request_id"].as_str().unwrap().to_string();

    let approval_path = format!("/sessions/{id}/approvals/{request_id}");
    let (status, body) = server
        .post_json(&approval_path, json!({"approve": true, "decided_by": "alice"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "applied");
    assert_eq!(body["outcome"]["status"], "responded");

    let (_, replay) = server.post_json(&approval_path, json!({"approve": true})).await;
    assert_eq!(replay["result"], "ignored");
    assert_eq!(kill.calls(), 1);

    let transcript: Value = server
        .client
        .get(server.url(&format!("/sessions/{id}/transcript")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let kinds: Vec<&str> = transcript
        .as_array()
        .unwrap()
        .iter()
        .map(|turn| turn["kind"].as_str().unwrap())
        .collect();
    assert_eq!(
        kinds,
        [
            "user_message",
            "tool_request",
            "approval_decision",
            "tool_result",
            "agent_message"
        ]
    );
    assert_eq!(transcript[2]["decided_by"], "alice");
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let server = GatewayTestServer::start(&CountingTool::mutating("kill_process")).await;

    let (status, body) = server
        .post_json("/sessions/nope/messages", json!({"message": "hi"}))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn deleted_session_disappears() {
    let server = GatewayTestServer::start(&CountingTool::mutating("kill_process")).await;
    let id = server.create_session().await;

    let response = server
        .client
        .delete(server.url(&format!("/sessions/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let sessions: Value = server
        .client
        .get(server.url("/sessions"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(sessions, json!([]));
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let server = GatewayTestServer::start(&CountingTool::mutating("kill_process")).await;
    let id = server.create_session().await;

    let (status, _) = server
        .post_json(
            &format!("/sessions/{id}/messages"),
            json!({"message": "x".repeat(70_000)}),
        )
        .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn event_stream_delivers_turns() {
    let server = GatewayTestServer::start(&CountingTool::mutating("kill_process")).await;
    let id = server.create_session().await;

    let mut events = server
        .client
        .get(server.url(&format!("/sessions/{id}/events")))
        .send()
        .await
        .unwrap();
    assert_eq!(events.status(), StatusCode::OK);

    server
        .post_json(
            &format!("/sessions/{id}/messages"),
            json!({"message": "stop pid 4242"}),
        )
        .await;

    let received = tokio::time::timeout(Duration::from_secs(5), async {
        let mut text = String::new();
        while !text.contains("\"kind\":\"tool_request\"") {
            let chunk = events.chunk().await.unwrap().expect("stream ended early");
            text.push_str(&String::from_utf8_lossy(&chunk));
        }
        text
    })
    .await
    .expect("turn events should arrive");

    assert!(received.contains("event: turn"));
    assert!(received.contains("id: 0"));
    assert!(received.contains("\"kind\":\"user_message\""));
}
