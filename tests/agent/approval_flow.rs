use std::time::Duration;

use hostwarden::agent::LoopOutcome;
use hostwarden::approval::{DecisionOutcome, GateState};
use hostwarden::error::SessionError;
use hostwarden::session::{ApprovalHandling, DECIDED_BY_CLOSE, DECIDED_BY_TIMEOUT, SessionSettings};
use hostwarden::tools::ToolErrorKind;
use hostwarden::transcript::{ToolOutcome, TurnKind, TurnPayload};
use serde_json::json;

use crate::agent_harness::{
    CountingTool, EagerPolicy, ScriptedPolicy, kinds, manager, no_resume, pending_id, request,
    respond,
};

#[tokio::test]
async fn denied_cleanup_never_runs() {
    let cleanup = CountingTool::mutating("disk_cleanup");
    let policy = ScriptedPolicy::new([request("disk_cleanup", json!({"min_age_days": 7}))]);
    let sessions = manager(policy, &[cleanup.clone()], no_resume());
    let session = sessions.create().await.unwrap();

    let id = pending_id(session.handle_user_message("free some disk").await.unwrap());
    assert_eq!(session.gate().state(id), Some(GateState::Pending));

    let handling = session.handle_approval(id, false, "alice").await.unwrap();

    assert_eq!(handling, ApprovalHandling::Recorded);
    assert_eq!(cleanup.calls(), 0);
    assert_eq!(session.gate().state(id), Some(GateState::Denied));
    let last = session.transcript().last().await.unwrap();
    let TurnPayload::ApprovalDecision(decision) = last.payload else {
        panic!("last turn should be the denial");
    };
    assert_eq!(decision.request_id, id);
    assert_eq!(decision.outcome, DecisionOutcome::Denied);
}

#[tokio::test]
async fn read_only_tool_runs_without_gate() {
    let processes = CountingTool::read_only("list_processes");
    let policy = ScriptedPolicy::new([
        request("list_processes", json!({})),
        respond("Nothing unusual is running."),
    ]);
    let sessions = manager(policy, &[processes.clone()], SessionSettings::default());
    let session = sessions.create().await.unwrap();

    let outcome = session.handle_user_message("what is running?").await.unwrap();

    assert_eq!(outcome, LoopOutcome::Responded);
    assert_eq!(processes.calls(), 1);
    assert!(session.pending().is_empty());
    assert_eq!(
        kinds(&session).await,
        vec![
            TurnKind::UserMessage,
            TurnKind::ToolRequest,
            TurnKind::ToolResult,
            TurnKind::AgentMessage,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn undecided_request_expires_and_late_approval_is_ignored() {
    let cleanup = CountingTool::mutating("disk_cleanup");
    let policy = ScriptedPolicy::new([request("disk_cleanup", json!({}))]);
    let sessions = manager(policy, &[cleanup.clone()], no_resume());
    let session = sessions.create().await.unwrap();

    let id = pending_id(session.handle_user_message("clean /tmp").await.unwrap());

    tokio::time::sleep(Duration::from_secs(29)).await;
    assert_eq!(session.gate().state(id), Some(GateState::Pending));

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(session.gate().state(id), Some(GateState::Expired));
    let last = session.transcript().last().await.unwrap();
    let TurnPayload::ApprovalDecision(decision) = last.payload else {
        panic!("last turn should be the expiry");
    };
    assert_eq!(decision.outcome, DecisionOutcome::Expired);
    assert_eq!(decision.decided_by, DECIDED_BY_TIMEOUT);

    let late = session.handle_approval(id, true, "alice").await.unwrap();
    assert_eq!(late, ApprovalHandling::Ignored);
    assert_eq!(cleanup.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn approval_cancels_expiry_timer() {
    let cleanup = CountingTool::mutating("disk_cleanup");
    let sessions = manager(EagerPolicy::new("disk_cleanup"), &[cleanup.clone()], SessionSettings::default());
    let session = sessions.create().await.unwrap();

    let id = pending_id(session.handle_user_message("clean /tmp").await.unwrap());
    session.handle_approval(id, true, "alice").await.unwrap();
    let turns_after_approval = session.transcript().len().await;

    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(session.gate().state(id), Some(GateState::Completed));
    assert_eq!(session.transcript().len().await, turns_after_approval);
    assert_eq!(cleanup.calls(), 1);
}

#[tokio::test]
async fn double_approval_invokes_once() {
    let kill = CountingTool::mutating("kill_process");
    let sessions = manager(EagerPolicy::new("kill_process"), &[kill.clone()], SessionSettings::default());
    let session = sessions.create().await.unwrap();
    let id = pending_id(session.handle_user_message("stop pid 4242").await.unwrap());

    let first = session.handle_approval(id, true, "alice").await.unwrap();
    let second = session.handle_approval(id, true, "bob").await.unwrap();

    assert_eq!(
        first,
        ApprovalHandling::Applied {
            outcome: LoopOutcome::Responded
        }
    );
    assert_eq!(second, ApprovalHandling::Ignored);
    assert_eq!(kill.calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_approvals_invoke_once() {
    let kill = CountingTool::mutating("kill_process");
    let sessions = manager(EagerPolicy::new("kill_process"), &[kill.clone()], SessionSettings::default());
    let session = sessions.create().await.unwrap();
    let id = pending_id(session.handle_user_message("stop pid 4242").await.unwrap());

    let handles: Vec<_> = (0..8)
        .map(|n| {
            let session = session.clone();
            tokio::spawn(async move { session.handle_approval(id, true, &format!("approver-{n}")).await })
        })
        .collect();
    let mut applied = 0;
    for handle in handles {
        if matches!(handle.await.unwrap().unwrap(), ApprovalHandling::Applied { .. }) {
            applied += 1;
        }
    }

    assert_eq!(applied, 1);
    assert_eq!(kill.calls(), 1);
    let decisions = kinds(&session)
        .await
        .into_iter()
        .filter(|kind| *kind == TurnKind::ApprovalDecision)
        .count();
    assert_eq!(decisions, 1);
}

#[tokio::test]
async fn closing_session_expires_pending_without_invoking() {
    let cleanup = CountingTool::mutating("disk_cleanup");
    let sessions = manager(EagerPolicy::new("disk_cleanup"), &[cleanup.clone()], SessionSettings::default());
    let session = sessions.create().await.unwrap();
    let id = pending_id(session.handle_user_message("clean /tmp").await.unwrap());

    sessions.close(session.id()).await.unwrap();

    assert_eq!(session.gate().state(id), Some(GateState::Expired));
    let last = session.transcript().last().await.unwrap();
    let TurnPayload::ApprovalDecision(decision) = last.payload else {
        panic!("last turn should be the close expiry");
    };
    assert_eq!(decision.decided_by, DECIDED_BY_CLOSE);
    assert!(matches!(
        session.handle_approval(id, true, "alice").await,
        Err(SessionError::Closed(_))
    ));
    assert!(matches!(
        session.handle_user_message("hello?").await,
        Err(SessionError::Closed(_))
    ));
    assert_eq!(cleanup.calls(), 0);
}

#[tokio::test]
async fn decline_resumes_agent_with_explanation() {
    let cleanup = CountingTool::mutating("disk_cleanup");
    let policy = ScriptedPolicy::new([
        request("disk_cleanup", json!({})),
        respond("Understood, I left /tmp alone."),
    ]);
    let sessions = manager(policy.clone(), &[cleanup.clone()], SessionSettings::default());
    let session = sessions.create().await.unwrap();
    let id = pending_id(session.handle_user_message("clean /tmp").await.unwrap());

    let handling = session.handle_approval(id, false, "alice").await.unwrap();

    assert_eq!(
        handling,
        ApprovalHandling::Applied {
            outcome: LoopOutcome::Responded
        }
    );
    assert_eq!(policy.steps(), 2);
    assert_eq!(cleanup.calls(), 0);
    let last = session.transcript().last().await.unwrap();
    assert_eq!(
        last.payload,
        TurnPayload::AgentMessage {
            text: "Understood, I left /tmp alone.".into()
        }
    );
}

#[tokio::test]
async fn unknown_tool_fails_only_that_request() {
    let policy = ScriptedPolicy::new([
        request("format_disk", json!({"device": "/dev/sda"})),
        respond("I cannot do that."),
    ]);
    let sessions = manager(policy, &[], SessionSettings::default());
    let session = sessions.create().await.unwrap();

    let outcome = session.handle_user_message("wipe everything").await.unwrap();

    assert_eq!(outcome, LoopOutcome::Responded);
    let turns = session.transcript().snapshot().await;
    let TurnPayload::ToolResult { outcome, .. } = &turns[2].payload else {
        panic!("expected a tool result");
    };
    let ToolOutcome::Failure { error } = outcome else {
        panic!("expected a failure");
    };
    assert_eq!(error.kind, ToolErrorKind::Unavailable);
    assert!(error.message.contains("format_disk"));
}

#[tokio::test]
async fn pending_session_does_not_block_others() {
    let cleanup = CountingTool::mutating("disk_cleanup");
    let sessions = manager(EagerPolicy::new("disk_cleanup"), &[cleanup.clone()], SessionSettings::default());
    let waiting = sessions.create().await.unwrap();
    let other = sessions.create().await.unwrap();

    let first = pending_id(waiting.handle_user_message("clean /tmp").await.unwrap());
    let second = pending_id(other.handle_user_message("clean /tmp too").await.unwrap());
    assert_ne!(first, second);

    other.handle_approval(second, true, "alice").await.unwrap();

    assert_eq!(waiting.gate().state(first), Some(GateState::Pending));
    assert_eq!(cleanup.calls(), 1);
}
