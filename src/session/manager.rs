use super::conversation::Session;
use super::types::{SessionInfo, SessionSettings};
use crate::agent::AgentLoop;
use crate::error::SessionError;
use crate::transcript::{AuditSink, TranscriptStore};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

/// Owns every live session of the process.
pub struct SessionManager {
    agent: Arc<AgentLoop>,
    settings: SessionSettings,
    audit_dir: Option<PathBuf>,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionManager {
    pub fn new(agent: Arc<AgentLoop>, settings: SessionSettings) -> Self {
        Self {
            agent,
            settings,
            audit_dir: None,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Persist every session's transcript as `<dir>/<session_id>.jsonl`.
    #[must_use]
    pub fn with_audit_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.audit_dir = dir;
        self
    }

    pub fn agent(&self) -> &Arc<AgentLoop> {
        &self.agent
    }

    pub async fn create(&self) -> Result<Arc<Session>, SessionError> {
        let id = Uuid::new_v4().to_string();
        let transcript = match &self.audit_dir {
            Some(dir) => {
                let sink = AuditSink::open(dir, &id)
                    .await
                    .map_err(|error| SessionError::Audit(format!("{error:#}")))?;
                TranscriptStore::with_audit(&id, sink)
            }
            None => TranscriptStore::new(&id),
        };

        let session = Session::new(transcript, Arc::clone(&self.agent), self.settings);
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), Arc::clone(&session));
        tracing::info!(session_id = %id, "session created");
        Ok(session)
    }

    pub fn get(&self, id: &str) -> Result<Arc<Session>, SessionError> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Close a session and forget it.
    pub async fn close(&self, id: &str) -> Result<(), SessionError> {
        let session = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.close().await;
        Ok(())
    }

    /// Live sessions, oldest first.
    pub async fn list(&self) -> Vec<SessionInfo> {
        let sessions: Vec<Arc<Session>> = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        let mut infos = Vec::with_capacity(sessions.len());
        for session in sessions {
            infos.push(session.info().await);
        }
        infos.sort_by_key(|info| info.created_at);
        infos
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close every session.
    pub async fn shutdown(&self) {
        let sessions: Vec<Arc<Session>> = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, session)| session)
            .collect();
        for session in sessions {
            session.close().await;
        }
    }
}
