use super::types::{ApprovalHandling, SessionInfo, SessionSettings};
use crate::agent::{AgentLoop, LoopOutcome};
use crate::approval::{
    ApprovalDecision, ApprovalGate, DecisionOutcome, PendingApproval, Transition,
};
use crate::error::SessionError;
use crate::transcript::{TranscriptStore, Turn, TurnPayload};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Decider recorded when a pending request times out.
pub const DECIDED_BY_TIMEOUT: &str = "timeout";
/// Decider recorded for requests expired by closing the session.
pub const DECIDED_BY_CLOSE: &str = "session-closed";

/// One conversation: transcript, approval gate and expiry timers.
///
/// Every event (user message, approval response, timer expiry, close) takes
/// `step_lock` for its whole duration, so decision steps of one session never
/// interleave. Sessions share nothing but the agent loop.
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    transcript: TranscriptStore,
    gate: ApprovalGate,
    agent: Arc<AgentLoop>,
    settings: SessionSettings,
    step_lock: tokio::sync::Mutex<()>,
    closed: AtomicBool,
    shutdown: CancellationToken,
    timers: Mutex<HashMap<Uuid, CancellationToken>>,
    this: Weak<Session>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(
        transcript: TranscriptStore,
        agent: Arc<AgentLoop>,
        settings: SessionSettings,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            id: transcript.session_id().to_string(),
            created_at: Utc::now(),
            transcript,
            gate: ApprovalGate::new(),
            agent,
            settings,
            step_lock: tokio::sync::Mutex::new(()),
            closed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            timers: Mutex::new(HashMap::new()),
            this: this.clone(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn transcript(&self) -> &TranscriptStore {
        &self.transcript
    }

    pub fn gate(&self) -> &ApprovalGate {
        &self.gate
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Turn> {
        self.transcript.subscribe()
    }

    pub fn pending(&self) -> Vec<PendingApproval> {
        self.gate.pending()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub async fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id.clone(),
            created_at: self.created_at,
            turns: self.transcript.len().await,
            pending: self.gate.pending(),
        }
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed(self.id.clone()));
        }
        Ok(())
    }

    /// Record a user message and let the agent act on it.
    ///
    /// While a mutating request is pending the message is recorded but the
    /// agent does not step; it sees the message once the request is decided.
    pub async fn handle_user_message(
        &self,
        text: impl Into<String>,
    ) -> Result<LoopOutcome, SessionError> {
        self.ensure_open()?;
        let _step = self.step_lock.lock().await;
        self.ensure_open()?;

        self.transcript.append(TurnPayload::user(text)).await;

        if let Some(oldest) = self.gate.pending().first() {
            tracing::debug!(
                session_id = %self.id,
                request_id = %oldest.request.request_id,
                "message recorded while approval is pending"
            );
            return Ok(LoopOutcome::AwaitingApproval {
                request_id: oldest.request.request_id,
            });
        }

        Ok(self.run_loop().await)
    }

    /// Apply an approve/deny response from the presentation layer.
    pub async fn handle_approval(
        &self,
        request_id: Uuid,
        approve: bool,
        decided_by: &str,
    ) -> Result<ApprovalHandling, SessionError> {
        self.ensure_open()?;
        let _step = self.step_lock.lock().await;
        self.ensure_open()?;

        let outcome = if approve {
            DecisionOutcome::Approved
        } else {
            DecisionOutcome::Denied
        };
        Ok(self
            .apply_decision(request_id, outcome, decided_by, None)
            .await)
    }

    /// Expire a pending request. Calling it for a request that was already
    /// decided is a no-op.
    pub async fn expire(&self, request_id: Uuid) -> Result<ApprovalHandling, SessionError> {
        self.ensure_open()?;
        let _step = self.step_lock.lock().await;
        self.ensure_open()?;

        let reason = format!(
            "no decision within {}s",
            self.settings.approval_timeout.as_secs()
        );
        Ok(self
            .apply_decision(
                request_id,
                DecisionOutcome::Expired,
                DECIDED_BY_TIMEOUT,
                Some(reason),
            )
            .await)
    }

    /// Close the session. Pending requests expire without running their tool
    /// and every later event fails with [`SessionError::Closed`].
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shutdown.cancel();
        let _step = self.step_lock.lock().await;
        self.timers().clear();

        let expired = self.gate.expire_all();
        for request in &expired {
            self.transcript
                .append(TurnPayload::ApprovalDecision(ApprovalDecision::new(
                    request.request_id,
                    DecisionOutcome::Expired,
                    DECIDED_BY_CLOSE,
                    Some("session closed".to_string()),
                )))
                .await;
        }
        tracing::info!(
            session_id = %self.id,
            expired = expired.len(),
            "session closed"
        );
    }

    async fn apply_decision(
        &self,
        request_id: Uuid,
        outcome: DecisionOutcome,
        decided_by: &str,
        reason: Option<String>,
    ) -> ApprovalHandling {
        let approved = match self.gate.decide(request_id, outcome) {
            Transition::Ignored => return ApprovalHandling::Ignored,
            Transition::Approved(request) => Some(request),
            Transition::Denied(_) | Transition::Expired(_) => None,
        };
        self.disarm_timer(request_id);

        tracing::info!(
            session_id = %self.id,
            %request_id,
            %outcome,
            decided_by,
            "approval decided"
        );
        self.transcript
            .append(TurnPayload::ApprovalDecision(ApprovalDecision::new(
                request_id, outcome, decided_by, reason,
            )))
            .await;

        match approved {
            Some(request) => {
                self.agent
                    .execute_approved(&self.transcript, &self.gate, &request)
                    .await;
            }
            None if !self.settings.resume_after_decline => return ApprovalHandling::Recorded,
            None => {}
        }

        if let Some(oldest) = self.gate.pending().first() {
            return ApprovalHandling::Applied {
                outcome: LoopOutcome::AwaitingApproval {
                    request_id: oldest.request.request_id,
                },
            };
        }
        ApprovalHandling::Applied {
            outcome: self.run_loop().await,
        }
    }

    async fn run_loop(&self) -> LoopOutcome {
        let outcome = self.agent.run(&self.transcript, &self.gate).await;
        if let LoopOutcome::AwaitingApproval { request_id } = outcome {
            self.arm_timer(request_id);
        }
        outcome
    }

    fn timers(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, CancellationToken>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start the expiry timer of a newly pending request. The task holds only
    /// a weak reference, so a dropped session is never kept alive by it.
    fn arm_timer(&self, request_id: Uuid) {
        let token = self.shutdown.child_token();
        self.timers().insert(request_id, token.clone());

        let session = self.this.clone();
        let timeout = self.settings.approval_timeout;
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = tokio::time::sleep(timeout) => {
                    let Some(session) = session.upgrade() else {
                        return;
                    };
                    if let Err(error) = session.expire(request_id).await {
                        tracing::debug!(%request_id, "expiry skipped: {error}");
                    }
                }
            }
        });
    }

    fn disarm_timer(&self, request_id: Uuid) {
        if let Some(token) = self.timers().remove(&request_id) {
            token.cancel();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
