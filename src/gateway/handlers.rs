use super::AppState;
use crate::agent::LoopOutcome;
use crate::approval::PendingApproval;
use crate::error::SessionError;
use crate::session::{ApprovalHandling, Session};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        IntoResponse, Json, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

/// Decider recorded for HTTP approvals that do not name one.
const DEFAULT_HTTP_APPROVER: &str = "http";

/// JSON error body with a status derived from the session error.
pub(super) struct ApiError(StatusCode, String);

impl From<SessionError> for ApiError {
    fn from(error: SessionError) -> Self {
        let status = match error {
            SessionError::NotFound(_) => StatusCode::NOT_FOUND,
            SessionError::Closed(_) => StatusCode::CONFLICT,
            SessionError::Audit(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self(status, error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.1 });
        (self.0, Json(body)).into_response()
    }
}

fn worker_failed(error: &tokio::task::JoinError) -> ApiError {
    tracing::error!("session worker failed: {error}");
    ApiError(
        StatusCode::INTERNAL_SERVER_ERROR,
        "session worker failed".to_string(),
    )
}

#[derive(Debug, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ApprovalBody {
    pub approve: bool,
    #[serde(default)]
    pub decided_by: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub outcome: LoopOutcome,
    pub pending: Vec<PendingApproval>,
}

/// GET /health
pub(super) async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "sessions": state.sessions.len(),
        "tools": state.registry.len(),
    }))
}

/// GET /tools
pub(super) async fn handle_tools(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.registry.descriptors())
}

/// POST /sessions
pub(super) async fn handle_create_session(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.sessions.create().await?;
    Ok((StatusCode::CREATED, Json(session.info().await)))
}

/// GET /sessions
pub(super) async fn handle_list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.sessions.list().await)
}

/// GET /sessions/{id}/transcript
pub(super) async fn handle_transcript(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.sessions.get(&id)?;
    Ok(Json(session.transcript().snapshot().await))
}

/// POST /sessions/{id}/messages
///
/// The loop runs on its own task so a client timeout cannot cut a decision
/// step in half.
pub(super) async fn handle_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<MessageBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    let session = state.sessions.get(&id)?;
    let worker = Arc::clone(&session);
    let outcome = tokio::spawn(async move { worker.handle_user_message(body.message).await })
        .await
        .map_err(|error| worker_failed(&error))??;

    Ok(Json(MessageResponse {
        outcome,
        pending: session.pending(),
    }))
}

/// POST /sessions/{id}/approvals/{request_id}
pub(super) async fn handle_approval(
    State(state): State<AppState>,
    Path((id, request_id)): Path<(String, Uuid)>,
    Json(body): Json<ApprovalBody>,
) -> Result<Json<ApprovalHandling>, ApiError> {
    let session = state.sessions.get(&id)?;
    let decided_by = body
        .decided_by
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_HTTP_APPROVER.to_string());

    let handling = tokio::spawn(async move {
        session
            .handle_approval(request_id, body.approve, &decided_by)
            .await
    })
    .await
    .map_err(|error| worker_failed(&error))??;

    Ok(Json(handling))
}

/// DELETE /sessions/{id}
pub(super) async fn handle_close_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.sessions.close(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /sessions/{id}/events
///
/// Server-sent events, one `turn` event per appended turn. Turns appended
/// before the subscription are available from the transcript endpoint.
pub(super) async fn handle_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let session = state.sessions.get(&id)?;
    Ok(Sse::new(turn_events(&session)).keep_alive(KeepAlive::default()))
}

fn turn_events(session: &Session) -> impl Stream<Item = Result<Event, Infallible>> + use<> {
    let session_id = session.id().to_string();
    BroadcastStream::new(session.subscribe()).filter_map(move |item| {
        let event = match item {
            Ok(turn) => Event::default()
                .event("turn")
                .id(turn.seq.to_string())
                .json_data(&turn)
                .map_err(|error| tracing::warn!(%session_id, "turn event encoding failed: {error}"))
                .ok(),
            Err(error) => {
                tracing::warn!(%session_id, "event stream lagged: {error}");
                None
            }
        };
        std::future::ready(event.map(Ok))
    })
}
