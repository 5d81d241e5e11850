//! Append-only, per-session record of turns.
//!
//! `append` is the only mutator. The store lock is held while the sequence
//! number is assigned, the audit line is written and the turn is broadcast,
//! so every observer (snapshot, subscribers, JSONL file) sees the same order.

mod audit;
mod turn;

pub use audit::{AuditSink, load_jsonl};
pub use turn::{ToolOutcome, Turn, TurnKind, TurnPayload};

use chrono::Utc;
use tokio::sync::{Mutex, broadcast};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug)]
struct Inner {
    turns: Vec<Turn>,
    audit: Option<AuditSink>,
}

#[derive(Debug)]
pub struct TranscriptStore {
    session_id: String,
    inner: Mutex<Inner>,
    events: broadcast::Sender<Turn>,
}

impl TranscriptStore {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self::build(session_id.into(), None)
    }

    pub fn with_audit(session_id: impl Into<String>, audit: AuditSink) -> Self {
        Self::build(session_id.into(), Some(audit))
    }

    fn build(session_id: String, audit: Option<AuditSink>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            session_id,
            inner: Mutex::new(Inner {
                turns: Vec::new(),
                audit,
            }),
            events,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Append a turn and return it with its assigned sequence number.
    ///
    /// The in-memory transcript is authoritative: an audit write failure is
    /// logged and does not reject the turn.
    pub async fn append(&self, payload: TurnPayload) -> Turn {
        let mut inner = self.inner.lock().await;
        let turn = Turn {
            seq: inner.turns.len() as u64,
            timestamp: Utc::now(),
            payload,
        };

        if let Some(audit) = inner.audit.as_mut()
            && let Err(error) = audit.write(&turn).await
        {
            tracing::error!(
                session_id = %self.session_id,
                seq = turn.seq,
                path = %audit.path().display(),
                "transcript audit write failed: {error:#}"
            );
        }

        tracing::debug!(
            session_id = %self.session_id,
            seq = turn.seq,
            kind = %turn.kind(),
            "turn appended"
        );
        inner.turns.push(turn.clone());
        // No subscribers is fine.
        let _ = self.events.send(turn.clone());
        turn
    }

    /// Full ordered copy of the transcript.
    pub async fn snapshot(&self) -> Vec<Turn> {
        self.inner.lock().await.turns.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.turns.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.turns.is_empty()
    }

    pub async fn last(&self) -> Option<Turn> {
        self.inner.lock().await.turns.last().cloned()
    }

    /// Stream of turns appended after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Turn> {
        self.events.subscribe()
    }
}
