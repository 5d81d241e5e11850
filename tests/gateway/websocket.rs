use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use hostwarden::approval::GateState;
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use uuid::Uuid;

use crate::agent_harness::CountingTool;
use crate::gateway_harness::GatewayTestServer;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(server: &GatewayTestServer) -> (Socket, String) {
    let (mut socket, _) = connect_async(server.ws_url())
        .await
        .expect("websocket upgrade should succeed");
    let hello = next_frame(&mut socket).await;
    assert_eq!(hello["type"], "connected");
    let session_id = hello["session_id"].as_str().unwrap().to_string();
    (socket, session_id)
}

async fn send(socket: &mut Socket, frame: Value) {
    socket
        .send(Message::Text(frame.to_string().into()))
        .await
        .unwrap();
}

async fn next_frame(socket: &mut Socket) -> Value {
    let message = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => break text,
                Some(Ok(_)) => continue,
                other => panic!("socket ended early: {other:?}"),
            }
        }
    })
    .await
    .expect("frame should arrive");
    serde_json::from_str(message.as_str()).unwrap()
}

/// Read frames until one of `frame_type` arrives; returns it and the turn
/// kinds seen on the way.
async fn frames_until(socket: &mut Socket, frame_type: &str) -> (Value, Vec<String>) {
    let mut turn_kinds = Vec::new();
    loop {
        let frame = next_frame(socket).await;
        if frame["type"] == frame_type {
            return (frame, turn_kinds);
        }
        if frame["type"] == "turn" {
            turn_kinds.push(frame["turn"]["kind"].as_str().unwrap().to_string());
        }
    }
}

#[tokio::test]
async fn websocket_message_then_approval_runs_tool_once() {
    let kill = CountingTool::mutating("kill_process");
    let server = GatewayTestServer::start(&kill).await;
    let (mut socket, session_id) = connect(&server).await;

    send(&mut socket, json!({"type": "user_message", "text": "stop pid 4242"})).await;
    let (outcome, turns) = frames_until(&mut socket, "outcome").await;
    assert_eq!(turns, ["user_message", "tool_request"]);
    assert_eq!(outcome["outcome"]["status"], "awaiting_approval");
    let request_id = outcome["outcome"]["request_id"].as_str().unwrap().to_string();
    assert_eq!(kill.calls(), 0);

    send(
        &mut socket,
        json!({"type": "approval_response", "request_id": request_id, "approve": true}),
    )
    .await;
    let (approval, turns) = frames_until(&mut socket, "approval").await;
    assert_eq!(turns, ["approval_decision", "tool_result", "agent_message"]);
    assert_eq!(approval["handling"]["result"], "applied");
    assert_eq!(kill.calls(), 1);

    let transcript: Value = server
        .client
        .get(server.url(&format!("/sessions/{session_id}/transcript")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(transcript[2]["decided_by"], "websocket");
}

#[tokio::test]
async fn websocket_ping_and_bad_frames_get_replies() {
    let server = GatewayTestServer::start(&CountingTool::mutating("kill_process")).await;
    let (mut socket, _) = connect(&server).await;

    send(&mut socket, json!({"type": "ping"})).await;
    assert_eq!(next_frame(&mut socket).await["type"], "pong");

    socket
        .send(Message::Text("not json".to_string().into()))
        .await
        .unwrap();
    let error = next_frame(&mut socket).await;
    assert_eq!(error["type"], "error");
    assert!(error["message"].as_str().unwrap().contains("invalid message"));
}

#[tokio::test]
async fn websocket_disconnect_closes_session_without_running_tool() {
    let cleanup = CountingTool::mutating("disk_cleanup");
    let server = GatewayTestServer::start(&cleanup).await;
    let (mut socket, session_id) = connect(&server).await;
    let transcript_path = format!("/sessions/{session_id}/transcript");
    assert_eq!(server.get_status(&transcript_path).await, StatusCode::OK);

    send(&mut socket, json!({"type": "user_message", "text": "clean /tmp"})).await;
    let (outcome, _) = frames_until(&mut socket, "outcome").await;
    assert_eq!(outcome["outcome"]["status"], "awaiting_approval");
    let request_id: Uuid = outcome["outcome"]["request_id"].as_str().unwrap().parse().unwrap();
    let session = server.sessions.get(&session_id).unwrap();
    drop(socket);

    tokio::time::timeout(Duration::from_secs(5), async {
        while server.get_status(&transcript_path).await != StatusCode::NOT_FOUND
            || session.gate().state(request_id) != Some(GateState::Expired)
        {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("session should close and expire its pending request after disconnect");
    assert_eq!(cleanup.calls(), 0);
}
