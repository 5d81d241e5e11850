//! Terminal presentation: prints turns as they land and asks the local user
//! to approve or decline each mutating request.

use crate::agent::LoopOutcome;
use crate::approval::{DecisionOutcome, summarize_args};
use crate::session::{ApprovalHandling, Session, SessionManager};
use crate::tools::ToolErrorKind;
use crate::transcript::{ToolOutcome, Turn, TurnPayload};
use crate::ui::style;
use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use uuid::Uuid;

/// Lines of tool output shown inline; the rest is elided.
const MAX_OUTPUT_LINES: usize = 12;

type InputLines = Lines<BufReader<Stdin>>;

/// Run the interactive chat, or a single exchange when `message` is given.
pub async fn run_chat(sessions: &SessionManager, message: Option<String>) -> Result<()> {
    let session = sessions.create().await?;
    let approver = local_approver();
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut printed = 0;

    if let Some(message) = message {
        exchange(&session, &mut input, &approver, &mut printed, message).await?;
        sessions.close(session.id()).await?;
        return Ok(());
    }

    println!(
        "{} session {}  ({} to leave)",
        style::header("hostwarden"),
        style::dim(session.id()),
        style::accent("/quit")
    );
    loop {
        prompt("you> ");
        let Some(line) = input.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" || line == "/exit" {
            break;
        }
        exchange(&session, &mut input, &approver, &mut printed, line.to_string()).await?;
    }

    sessions.close(session.id()).await?;
    print_new_turns(&session, &mut printed).await;
    Ok(())
}

/// One user message plus every approval it leads to.
async fn exchange(
    session: &Session,
    input: &mut InputLines,
    approver: &str,
    printed: &mut usize,
    message: String,
) -> Result<()> {
    let mut outcome = session.handle_user_message(message).await?;
    print_new_turns(session, printed).await;

    while let LoopOutcome::AwaitingApproval { request_id } = outcome {
        let approve = ask_approval(session, input, request_id).await?;
        let handling = session.handle_approval(request_id, approve, approver).await?;
        print_new_turns(session, printed).await;

        outcome = match handling {
            ApprovalHandling::Applied { outcome } => outcome,
            ApprovalHandling::Recorded => break,
            ApprovalHandling::Ignored => {
                println!("{}", style::dim("That request was already decided."));
                match session.pending().first() {
                    Some(next) => LoopOutcome::AwaitingApproval {
                        request_id: next.request.request_id,
                    },
                    None => break,
                }
            }
        };
    }
    Ok(())
}

async fn ask_approval(session: &Session, input: &mut InputLines, request_id: Uuid) -> Result<bool> {
    if let Some(pending) = session
        .pending()
        .into_iter()
        .find(|pending| pending.request.request_id == request_id)
    {
        println!(
            "{} {} {}",
            style::warn("approval needed:"),
            style::accent(&pending.request.tool_name),
            summarize_args(&pending.request.arguments)
        );
    }
    prompt("approve? [y/N] ");
    let answer = input.next_line().await?.unwrap_or_default();
    Ok(parse_answer(&answer))
}

fn parse_answer(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn prompt(text: &str) {
    print!("{text}");
    let _ = std::io::stdout().flush();
}

async fn print_new_turns(session: &Session, printed: &mut usize) {
    let turns = session.transcript().snapshot().await;
    for turn in turns.iter().skip(*printed) {
        if !matches!(turn.payload, TurnPayload::UserMessage { .. }) {
            println!("{}", render_turn(turn));
        }
    }
    *printed = turns.len();
}

/// `user@host` of whoever runs the terminal, recorded as the decider.
pub fn local_approver() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    let host = hostname::get()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "localhost".to_string());
    format!("{user}@{host}")
}

/// Human-readable rendering of any turn.
pub fn render_turn(turn: &Turn) -> String {
    match &turn.payload {
        TurnPayload::UserMessage { text } => format!("{} {text}", style::header("you>")),
        TurnPayload::AgentMessage { text } => format!("{}\n{text}", style::header("hostwarden>")),
        TurnPayload::ToolRequest { request, mutating } => {
            let marker = if *mutating {
                style::warn(" [requires approval]")
            } else {
                String::new()
            };
            format!(
                "{} {}{marker} {}",
                style::dim("▸"),
                style::accent(&request.tool_name),
                style::dim(summarize_args(&request.arguments))
            )
        }
        TurnPayload::ToolResult {
            tool_name, outcome, ..
        } => match outcome {
            ToolOutcome::Success { output } => format!(
                "{} {}\n{}",
                style::success("✓"),
                style::accent(tool_name),
                style::dim(elide_lines(&output.content, MAX_OUTPUT_LINES))
            ),
            ToolOutcome::Failure { error } => {
                let label = match error.kind {
                    ToolErrorKind::Timeout => "timed out",
                    ToolErrorKind::InvalidArguments => "invalid arguments",
                    ToolErrorKind::ExecutionFailure => "failed",
                    ToolErrorKind::Unavailable => "unavailable",
                };
                format!(
                    "{} {} {label}: {}",
                    style::failure("✗"),
                    style::accent(tool_name),
                    error.message
                )
            }
        },
        TurnPayload::ApprovalDecision(decision) => {
            let verdict = match decision.outcome {
                DecisionOutcome::Approved => style::success("approved"),
                DecisionOutcome::Denied => style::failure("denied"),
                DecisionOutcome::Expired => style::warn("expired"),
            };
            let reason = decision
                .reason
                .as_deref()
                .map(|reason| format!(" ({reason})"))
                .unwrap_or_default();
            format!("{verdict} by {}{reason}", decision.decided_by)
        }
    }
}

fn elide_lines(text: &str, max_lines: usize) -> String {
    let total = text.lines().count();
    if total <= max_lines {
        return text.to_string();
    }
    let mut shown: Vec<&str> = text.lines().take(max_lines).collect();
    let more = format!("… {} more lines", total - max_lines);
    shown.push(&more);
    shown.join("\n")
}

/// Print a persisted transcript.
pub async fn replay(path: &std::path::Path) -> Result<()> {
    let turns = crate::transcript::load_jsonl(path).await?;
    for turn in &turns {
        println!(
            "{} {}",
            style::dim(format!("#{} {}", turn.seq, turn.timestamp.format("%H:%M:%S"))),
            render_turn(turn)
        );
    }
    println!("{}", style::dim(format!("{} turns", turns.len())));
    Ok(())
}
