use super::action::{Action, ToolCallRequest};
use super::policy::DecisionPolicy;
use crate::approval::ApprovalGate;
use crate::config::schema::MAX_STEPS_CAP;
use crate::error::LlmError;
use crate::tools::{ToolError, ToolInvoker, ToolRegistry};
use crate::transcript::{TranscriptStore, TurnPayload};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Why a run of the loop handed control back to its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoopOutcome {
    /// The agent answered with text.
    Responded,
    /// A mutating tool call is waiting on the approval gate.
    AwaitingApproval { request_id: Uuid },
    /// The step budget ran out before the agent answered.
    StepLimit,
    /// The decision policy failed; the failure was recorded as an agent message.
    PolicyFailed,
}

/// Drives a [`DecisionPolicy`] against one session's transcript.
pub struct AgentLoop {
    policy: Arc<dyn DecisionPolicy>,
    registry: Arc<ToolRegistry>,
    max_steps: u32,
}

impl AgentLoop {
    pub fn new(
        policy: Arc<dyn DecisionPolicy>,
        registry: Arc<ToolRegistry>,
        max_steps: u32,
    ) -> Self {
        Self {
            policy,
            registry,
            max_steps: max_steps.clamp(1, MAX_STEPS_CAP),
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// One decision over the current transcript.
    pub async fn step(&self, transcript: &TranscriptStore) -> Result<Action, LlmError> {
        let turns = transcript.snapshot().await;
        self.policy.step(&turns).await
    }

    /// Step until the agent answers, a mutating call suspends on `gate`, or
    /// the step budget is spent.
    ///
    /// Read-only tools are invoked inline. A request for an unknown tool is
    /// recorded as a failed result and the loop continues.
    pub async fn run(&self, transcript: &TranscriptStore, gate: &ApprovalGate) -> LoopOutcome {
        let session_id = transcript.session_id();

        for step in 1..=self.max_steps {
            let action = match self.step(transcript).await {
                Ok(action) => action,
                Err(error) => {
                    tracing::warn!(
                        %session_id,
                        policy = self.policy.name(),
                        step,
                        "decision policy failed: {error}"
                    );
                    transcript
                        .append(TurnPayload::agent(format!(
                            "I could not reach the decision model: {error}"
                        )))
                        .await;
                    return LoopOutcome::PolicyFailed;
                }
            };

            let request = match action {
                Action::Respond(text) => {
                    transcript.append(TurnPayload::agent(text)).await;
                    return LoopOutcome::Responded;
                }
                Action::RequestTool(request) => request,
            };

            let mutating = match self.registry.lookup(&request.tool_name) {
                Ok(descriptor) => descriptor.mutating,
                Err(error) => {
                    tracing::warn!(%session_id, tool = %request.tool_name, "{error}");
                    transcript
                        .append(TurnPayload::ToolRequest {
                            request: request.clone(),
                            mutating: false,
                        })
                        .await;
                    transcript
                        .append(TurnPayload::tool_result(
                            &request,
                            Err(ToolError::unavailable(error.to_string())),
                        ))
                        .await;
                    continue;
                }
            };

            if mutating {
                if let Err(error) = gate.open(request.clone()) {
                    tracing::warn!(%session_id, "{error}");
                    transcript
                        .append(TurnPayload::ToolRequest {
                            request: request.clone(),
                            mutating: true,
                        })
                        .await;
                    transcript
                        .append(TurnPayload::tool_result(
                            &request,
                            Err(ToolError::execution(error.to_string())),
                        ))
                        .await;
                    continue;
                }
                tracing::info!(
                    %session_id,
                    request_id = %request.request_id,
                    tool = %request.tool_name,
                    "tool call awaiting approval"
                );
                let request_id = request.request_id;
                transcript
                    .append(TurnPayload::ToolRequest {
                        request,
                        mutating: true,
                    })
                    .await;
                return LoopOutcome::AwaitingApproval { request_id };
            }

            transcript
                .append(TurnPayload::ToolRequest {
                    request: request.clone(),
                    mutating: false,
                })
                .await;
            self.invoke_and_record(transcript, &request).await;
        }

        tracing::info!(%session_id, max_steps = self.max_steps, "step limit reached");
        transcript
            .append(TurnPayload::agent(format!(
                "I stopped after {} steps without reaching a conclusion. \
                 Ask me to continue if you want me to keep going.",
                self.max_steps
            )))
            .await;
        LoopOutcome::StepLimit
    }

    /// Run an approved request and close its gate entry. Must only be called
    /// with the request returned by `Transition::Approved`.
    pub async fn execute_approved(
        &self,
        transcript: &TranscriptStore,
        gate: &ApprovalGate,
        request: &ToolCallRequest,
    ) {
        self.invoke_and_record(transcript, request).await;
        if let Err(error) = gate.complete(request.request_id) {
            tracing::error!(
                session_id = %transcript.session_id(),
                request_id = %request.request_id,
                "{error}"
            );
        }
    }

    async fn invoke_and_record(&self, transcript: &TranscriptStore, request: &ToolCallRequest) {
        let result = self
            .registry
            .invoke(&request.tool_name, &request.arguments)
            .await;
        match &result {
            Ok(_) => tracing::info!(
                session_id = %transcript.session_id(),
                request_id = %request.request_id,
                tool = %request.tool_name,
                "tool invoked"
            ),
            Err(error) => tracing::warn!(
                session_id = %transcript.session_id(),
                request_id = %request.request_id,
                tool = %request.tool_name,
                kind = %error.kind,
                "tool failed: {}",
                error.message
            ),
        }
        transcript
            .append(TurnPayload::tool_result(request, result))
            .await;
    }
}
