use super::AppState;
use super::events::{ClientMessage, ServerMessage};
use crate::session::Session;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

/// Decider recorded for approvals given over the WebSocket.
const WS_APPROVER: &str = "websocket";

/// GET /ws: one fresh session per connection, closed on disconnect.
pub(super) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let session = match state.sessions.create().await {
        Ok(session) => session,
        Err(error) => {
            tracing::error!("websocket session creation failed: {error}");
            return;
        }
    };
    let session_id = session.id().to_string();
    tracing::info!(%session_id, "websocket connected");

    let (sink, mut stream) = socket.split();
    let (replies, reply_rx) = mpsc::channel::<ServerMessage>(32);
    let writer = tokio::spawn(write_loop(sink, session.subscribe(), reply_rx));

    let _ = replies
        .send(ServerMessage::Connected {
            session_id: session_id.clone(),
        })
        .await;

    while let Some(result) = stream.next().await {
        let message = match result {
            Ok(message) => message,
            Err(error) => {
                tracing::debug!(%session_id, "websocket receive error: {error}");
                break;
            }
        };

        let reply = match message {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_message) => handle_client_message(&session, client_message).await,
                Err(error) => ServerMessage::error(format!("invalid message: {error}")),
            },
            Message::Close(_) => break,
            _ => continue,
        };
        if replies.send(reply).await.is_err() {
            break;
        }
    }

    drop(replies);
    if let Err(error) = state.sessions.close(&session_id).await {
        tracing::debug!(%session_id, "websocket session already gone: {error}");
    }
    writer.abort();
    tracing::info!(%session_id, "websocket disconnected");
}

async fn handle_client_message(session: &Arc<Session>, message: ClientMessage) -> ServerMessage {
    match message {
        ClientMessage::UserMessage { text } => match session.handle_user_message(text).await {
            Ok(outcome) => ServerMessage::Outcome { outcome },
            Err(error) => ServerMessage::error(error.to_string()),
        },
        ClientMessage::ApprovalResponse {
            request_id,
            approve,
        } => match session
            .handle_approval(request_id, approve, WS_APPROVER)
            .await
        {
            Ok(handling) => ServerMessage::Approval { handling },
            Err(error) => ServerMessage::error(error.to_string()),
        },
        ClientMessage::Ping => ServerMessage::Pong,
    }
}

/// Forward appended turns and direct replies to the client. Turns go first,
/// so an outcome never overtakes the turns it summarizes.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut turns: broadcast::Receiver<crate::transcript::Turn>,
    mut replies: mpsc::Receiver<ServerMessage>,
) {
    loop {
        let message = tokio::select! {
            biased;
            turn = turns.recv() => match turn {
                Ok(turn) => ServerMessage::Turn { turn },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    ServerMessage::error(format!("{skipped} turns dropped; refetch the transcript"))
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            reply = replies.recv() => match reply {
                Some(reply) => reply,
                None => break,
            },
        };
        if sink.send(Message::Text(message.to_json().into())).await.is_err() {
            break;
        }
    }
}
