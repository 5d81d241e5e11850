//! Axum HTTP gateway: REST session API, SSE turn stream and WebSocket chat.
//!
//! Request bodies are capped at 64 KiB and every request is bounded by a
//! timeout. Agent work triggered by a request runs on its own task, so a
//! timed-out client never interrupts a decision step.

mod events;
mod handlers;
mod websocket;

pub use events::{ClientMessage, ServerMessage};
pub use handlers::{ApprovalBody, MessageBody, MessageResponse};

use crate::session::SessionManager;
use crate::tools::ToolRegistry;
use anyhow::{Context, Result};
use axum::{
    Router,
    http::StatusCode,
    routing::{delete, get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Maximum request body size (64KB)
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout; long enough for a multi-step agent run.
pub const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub registry: Arc<ToolRegistry>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::handle_health))
        .route("/tools", get(handlers::handle_tools))
        .route(
            "/sessions",
            post(handlers::handle_create_session).get(handlers::handle_list_sessions),
        )
        .route("/sessions/{id}", delete(handlers::handle_close_session))
        .route("/sessions/{id}/transcript", get(handlers::handle_transcript))
        .route("/sessions/{id}/messages", post(handlers::handle_message))
        .route(
            "/sessions/{id}/approvals/{request_id}",
            post(handlers::handle_approval),
        )
        .route("/sessions/{id}/events", get(handlers::handle_events))
        .route("/ws", get(websocket::ws_handler))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
}

/// Bind and serve until Ctrl-C. Refuses a non-local bind unless
/// `allow_public_bind` is set.
pub async fn run_gateway(
    host: &str,
    port: u16,
    allow_public_bind: bool,
    state: AppState,
) -> Result<()> {
    if !is_local_host(host) && !allow_public_bind {
        anyhow::bail!(
            "refusing to bind to {host}: the gateway can kill processes and delete files.\n\
             Use --host 127.0.0.1 (default) or set [gateway] allow_public_bind = true."
        );
    }

    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("failed to bind {host}:{port}"))?;

    run_gateway_with_listener(listener, state).await
}

/// Serve from a pre-bound listener.
pub async fn run_gateway_with_listener(
    listener: tokio::net::TcpListener,
    state: AppState,
) -> Result<()> {
    let addr = listener.local_addr()?;
    println!("◆ hostwarden gateway listening on http://{addr}");
    println!("  GET  /health");
    println!("  GET  /tools");
    println!("  POST /sessions");
    println!("  POST /sessions/{{id}}/messages");
    println!("  POST /sessions/{{id}}/approvals/{{request_id}}");
    println!("  GET  /sessions/{{id}}/events   (SSE)");
    println!("  GET  /ws                      (WebSocket)");
    println!("  Ctrl+C to stop\n");
    tracing::info!(%addr, tools = state.registry.len(), "gateway started");

    let sessions = Arc::clone(&state.sessions);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    sessions.shutdown().await;
    tracing::info!("gateway stopped");
    Ok(())
}

fn is_local_host(host: &str) -> bool {
    matches!(host, "127.0.0.1" | "localhost" | "::1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{
        Action, AgentLoop, DecisionPolicy, LoopOutcome, PolicyFuture, ToolCallRequest,
    };
    use crate::error::SessionError;
    use crate::session::{ApprovalHandling, SessionSettings};
    use crate::tools::{InputSchema, Tool, ToolArguments, ToolDescriptor, ToolFuture, ToolOutput};
    use crate::transcript::{Turn, TurnKind};
    use axum::extract::{Path, State};
    use axum::response::{IntoResponse, Json};
    use uuid::Uuid;

    struct RestartPolicy;

    impl DecisionPolicy for RestartPolicy {
        fn name(&self) -> &str {
            "restart"
        }

        fn step<'a>(&'a self, transcript: &'a [Turn]) -> PolicyFuture<'a> {
            let last = transcript.last().map(Turn::kind);
            Box::pin(async move {
                Ok(match last {
                    Some(TurnKind::UserMessage) => Action::RequestTool(ToolCallRequest::new(
                        "kill_process",
                        ToolArguments::new(),
                    )),
                    _ => Action::Respond("ok".into()),
                })
            })
        }
    }

    struct NoopKill(ToolDescriptor);

    impl Tool for NoopKill {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.0
        }

        fn execute<'a>(&'a self, _arguments: &'a ToolArguments) -> ToolFuture<'a> {
            Box::pin(async { Ok(ToolOutput::text("terminated")) })
        }
    }

    fn test_state() -> AppState {
        let mut registry = ToolRegistry::default();
        registry
            .register(Arc::new(NoopKill(ToolDescriptor::mutating(
                "kill_process",
                "kill",
                InputSchema::empty(),
            ))))
            .unwrap();
        let registry = Arc::new(registry);
        let agent = AgentLoop::new(Arc::new(RestartPolicy), Arc::clone(&registry), 10);
        AppState {
            sessions: Arc::new(SessionManager::new(
                Arc::new(agent),
                SessionSettings::default(),
            )),
            registry,
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[test]
    fn security_body_limit_is_64kb() {
        assert_eq!(MAX_BODY_SIZE, 65_536);
    }

    #[test]
    fn app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn loopback_hosts_are_local() {
        assert!(is_local_host("127.0.0.1"));
        assert!(is_local_host("localhost"));
        assert!(!is_local_host("0.0.0.0"));
    }

    #[tokio::test]
    async fn public_bind_is_refused_without_opt_in() {
        let error = run_gateway("0.0.0.0", 0, false, test_state())
            .await
            .unwrap_err();
        assert!(error.to_string().contains("refusing to bind"));
    }

    #[tokio::test]
    async fn health_reports_sessions_and_tools() {
        let state = test_state();
        let response = handlers::handle_health(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["sessions"], 0);
        assert_eq!(json["tools"], 1);
    }

    #[tokio::test]
    async fn tools_lists_descriptors_with_risk() {
        let response = handlers::handle_tools(State(test_state()))
            .await
            .into_response();
        let json = body_json(response).await;
        assert_eq!(json[0]["name"], "kill_process");
        assert_eq!(json[0]["mutating"], true);
    }

    #[tokio::test]
    async fn message_then_approval_over_rest() {
        let state = test_state();
        let session = state.sessions.create().await.unwrap();
        let id = session.id().to_string();

        let Json(response) = handlers::handle_message(
            State(state.clone()),
            Path(id.clone()),
            Json(MessageBody {
                message: "kill the miner".into(),
            }),
        )
        .await
        .unwrap_or_else(|_| panic!("message should be accepted"));
        let LoopOutcome::AwaitingApproval { request_id } = response.outcome else {
            panic!("expected pending approval");
        };
        assert_eq!(response.pending.len(), 1);
        let value = serde_json::to_value(&response.outcome).unwrap();
        assert_eq!(value["status"], "awaiting_approval");

        let Json(handling) = handlers::handle_approval(
            State(state.clone()),
            Path((id.clone(), request_id)),
            Json(ApprovalBody {
                approve: true,
                decided_by: Some("alice".into()),
            }),
        )
        .await
        .unwrap_or_else(|_| panic!("approval should be accepted"));
        assert_eq!(
            handling,
            ApprovalHandling::Applied {
                outcome: LoopOutcome::Responded
            }
        );

        let transcript = handlers::handle_transcript(State(state), Path(id))
            .await
            .unwrap_or_else(|_| panic!("transcript should exist"))
            .into_response();
        let json = body_json(transcript).await;
        assert_eq!(json[2]["kind"], "approval_decision");
        assert_eq!(json[2]["decided_by"], "alice");
        assert_eq!(json[3]["kind"], "tool_result");
        assert_eq!(json[3]["outcome"]["status"], "success");
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let response = handlers::handle_approval(
            State(test_state()),
            Path(("missing".to_string(), Uuid::new_v4())),
            Json(ApprovalBody {
                approve: true,
                decided_by: None,
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn closed_session_error_maps_to_conflict() {
        let response =
            handlers::ApiError::from(SessionError::Closed("s-1".into())).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = body_json(response).await;
        assert_eq!(json["error"], "session s-1 is closed");
    }

    #[tokio::test]
    async fn delete_closes_session() {
        let state = test_state();
        let session = state.sessions.create().await.unwrap();
        let status = handlers::handle_close_session(
            State(state.clone()),
            Path(session.id().to_string()),
        )
        .await
        .unwrap_or_else(|_| panic!("close should succeed"));
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(session.is_closed());
        assert!(state.sessions.is_empty());
    }
}
