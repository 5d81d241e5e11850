#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hostwarden::agent::{Action, AgentLoop, DecisionPolicy, LoopOutcome, PolicyFuture, ToolCallRequest};
use hostwarden::session::{Session, SessionManager, SessionSettings};
use hostwarden::tools::{
    InputSchema, Tool, ToolArguments, ToolDescriptor, ToolFuture, ToolOutput, ToolRegistry,
};
use hostwarden::transcript::{Turn, TurnKind};
use serde_json::Value;
use uuid::Uuid;

/// Replays a fixed list of actions, then answers "done" forever.
pub struct ScriptedPolicy {
    script: Mutex<VecDeque<Action>>,
    steps: AtomicUsize,
}

impl ScriptedPolicy {
    pub fn new(actions: impl IntoIterator<Item = Action>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(actions.into_iter().collect()),
            steps: AtomicUsize::new(0),
        })
    }

    pub fn steps(&self) -> usize {
        self.steps.load(Ordering::SeqCst)
    }
}

impl DecisionPolicy for ScriptedPolicy {
    fn name(&self) -> &str {
        "scripted"
    }

    fn step<'a>(&'a self, _transcript: &'a [Turn]) -> PolicyFuture<'a> {
        self.steps.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Action::Respond("done".into()));
        Box::pin(async move { Ok(next) })
    }
}

/// Requests `tool` whenever the newest turn is a user message.
pub struct EagerPolicy {
    tool: String,
}

impl EagerPolicy {
    pub fn new(tool: &str) -> Arc<Self> {
        Arc::new(Self { tool: tool.into() })
    }
}

impl DecisionPolicy for EagerPolicy {
    fn name(&self) -> &str {
        "eager"
    }

    fn step<'a>(&'a self, transcript: &'a [Turn]) -> PolicyFuture<'a> {
        let action = match transcript.last().map(Turn::kind) {
            Some(TurnKind::UserMessage) => request(&self.tool, Value::Null),
            _ => Action::Respond("done".into()),
        };
        Box::pin(async move { Ok(action) })
    }
}

/// Tool that counts invocations, standing in for a real side effect.
pub struct CountingTool {
    descriptor: ToolDescriptor,
    calls: AtomicUsize,
    delay: Duration,
}

impl CountingTool {
    pub fn read_only(name: &str) -> Arc<Self> {
        Self::build(ToolDescriptor::read_only(name, "test lookup", InputSchema::empty()), Duration::ZERO)
    }

    pub fn mutating(name: &str) -> Arc<Self> {
        Self::build(ToolDescriptor::mutating(name, "test action", InputSchema::empty()), Duration::ZERO)
    }

    pub fn slow_read_only(name: &str, delay: Duration) -> Arc<Self> {
        Self::build(ToolDescriptor::read_only(name, "slow lookup", InputSchema::empty()), delay)
    }

    fn build(descriptor: ToolDescriptor, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            descriptor,
            calls: AtomicUsize::new(0),
            delay,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Tool for CountingTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn execute<'a>(&'a self, _arguments: &'a ToolArguments) -> ToolFuture<'a> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(ToolOutput::text(format!("call #{call}")))
        })
    }
}

pub fn request(tool: &str, arguments: Value) -> Action {
    let arguments = arguments.as_object().cloned().unwrap_or_default();
    Action::RequestTool(ToolCallRequest::new(tool, arguments))
}

pub fn respond(text: &str) -> Action {
    Action::Respond(text.into())
}

pub fn registry(tools: &[Arc<CountingTool>]) -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::default();
    for tool in tools {
        registry.register(Arc::clone(tool) as Arc<dyn Tool>).unwrap();
    }
    Arc::new(registry)
}

pub fn manager(
    policy: Arc<dyn DecisionPolicy>,
    tools: &[Arc<CountingTool>],
    settings: SessionSettings,
) -> SessionManager {
    let agent = AgentLoop::new(policy, registry(tools), 10);
    SessionManager::new(Arc::new(agent), settings)
}

pub fn no_resume() -> SessionSettings {
    SessionSettings {
        resume_after_decline: false,
        ..SessionSettings::default()
    }
}

pub fn pending_id(outcome: LoopOutcome) -> Uuid {
    match outcome {
        LoopOutcome::AwaitingApproval { request_id } => request_id,
        other => panic!("expected a pending approval, got {other:?}"),
    }
}

pub async fn kinds(session: &Session) -> Vec<TurnKind> {
    session
        .transcript()
        .snapshot()
        .await
        .iter()
        .map(Turn::kind)
        .collect()
}
