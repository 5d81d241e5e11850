//! Per-session approval gate for mutating tool calls.
//!
//! Every mutating [`ToolCallRequest`] gets one entry that starts `Pending`
//! and moves to exactly one terminal state:
//!
//! ```text
//! Pending ──approve──▶ Approved ──complete──▶ Completed
//!    │
//!    ├──deny────▶ Denied
//!    └──timeout─▶ Expired
//! ```
//!
//! `Approved` is reachable from `Pending` only once, and the caller that
//! observes [`Transition::Approved`] is the only one allowed to invoke the
//! tool. Decisions for entries that are no longer pending are ignored.

use super::decision::DecisionOutcome;
use crate::agent::ToolCallRequest;
use crate::error::GateError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GateState {
    Pending,
    Approved,
    Denied,
    Expired,
    Completed,
}

impl GateState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Denied | Self::Expired | Self::Completed)
    }
}

/// Result of applying a decision to the gate.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The request left `Pending` via approval; the caller must invoke it.
    Approved(ToolCallRequest),
    Denied(ToolCallRequest),
    Expired(ToolCallRequest),
    /// Unknown request id or the request was already decided.
    Ignored,
}

#[derive(Debug, Clone)]
struct GateEntry {
    request: ToolCallRequest,
    state: GateState,
    opened_at: DateTime<Utc>,
}

/// A pending request as shown to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingApproval {
    pub request: ToolCallRequest,
    pub opened_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct ApprovalGate {
    entries: Mutex<HashMap<Uuid, GateEntry>>,
}

impl ApprovalGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, GateEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a `Pending` entry. Request ids are never reused, even after the
    /// earlier entry reached a terminal state.
    pub fn open(&self, request: ToolCallRequest) -> Result<(), GateError> {
        let mut entries = self.entries();
        if entries.contains_key(&request.request_id) {
            return Err(GateError::DuplicateRequest {
                request_id: request.request_id.to_string(),
            });
        }
        tracing::debug!(
            request_id = %request.request_id,
            tool = %request.tool_name,
            "approval gate opened"
        );
        entries.insert(
            request.request_id,
            GateEntry {
                request,
                state: GateState::Pending,
                opened_at: Utc::now(),
            },
        );
        Ok(())
    }

    /// Apply a decision to a `Pending` entry.
    pub fn decide(&self, request_id: Uuid, outcome: DecisionOutcome) -> Transition {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(&request_id) else {
            tracing::warn!(%request_id, %outcome, "decision for unknown request ignored");
            return Transition::Ignored;
        };
        if entry.state != GateState::Pending {
            tracing::warn!(
                %request_id,
                %outcome,
                state = %entry.state,
                "decision for non-pending request ignored"
            );
            return Transition::Ignored;
        }

        let request = entry.request.clone();
        match outcome {
            DecisionOutcome::Approved => {
                entry.state = GateState::Approved;
                Transition::Approved(request)
            }
            DecisionOutcome::Denied => {
                entry.state = GateState::Denied;
                Transition::Denied(request)
            }
            DecisionOutcome::Expired => {
                entry.state = GateState::Expired;
                Transition::Expired(request)
            }
        }
    }

    /// Mark an approved request as executed.
    pub fn complete(&self, request_id: Uuid) -> Result<(), GateError> {
        let mut entries = self.entries();
        match entries.get_mut(&request_id) {
            Some(entry) if entry.state == GateState::Approved => {
                entry.state = GateState::Completed;
                Ok(())
            }
            _ => Err(GateError::NotApproved {
                request_id: request_id.to_string(),
            }),
        }
    }

    /// Expire every pending entry, returning the affected requests in the
    /// order they were opened.
    pub fn expire_all(&self) -> Vec<ToolCallRequest> {
        let mut entries = self.entries();
        let mut expired: Vec<(DateTime<Utc>, ToolCallRequest)> = entries
            .values_mut()
            .filter(|entry| entry.state == GateState::Pending)
            .map(|entry| {
                entry.state = GateState::Expired;
                (entry.opened_at, entry.request.clone())
            })
            .collect();
        expired.sort_by_key(|(opened_at, _)| *opened_at);
        expired.into_iter().map(|(_, request)| request).collect()
    }

    pub fn state(&self, request_id: Uuid) -> Option<GateState> {
        self.entries().get(&request_id).map(|entry| entry.state)
    }

    /// Pending requests, oldest first.
    pub fn pending(&self) -> Vec<PendingApproval> {
        let mut pending: Vec<PendingApproval> = self
            .entries()
            .values()
            .filter(|entry| entry.state == GateState::Pending)
            .map(|entry| PendingApproval {
                request: entry.request.clone(),
                opened_at: entry.opened_at,
            })
            .collect();
        pending.sort_by_key(|approval| approval.opened_at);
        pending
    }

    pub fn has_pending(&self) -> bool {
        self.entries()
            .values()
            .any(|entry| entry.state == GateState::Pending)
    }
}
