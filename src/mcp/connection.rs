use super::content::{ToolContent, from_rmcp_contents};
use crate::tools::ToolError;
use anyhow::{Context, Result, anyhow};
use rmcp::service::{RoleClient, RunningService};
use rmcp::transport::{ConfigureCommandExt, TokioChildProcess};
use rmcp::{ServiceExt, model::CallToolRequestParams};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::RwLock;

type McpService = RunningService<RoleClient, ()>;

/// Failure of a single MCP tool call.
#[derive(Debug, thiserror::Error)]
pub enum McpCallError {
    #[error("MCP tool '{tool}' on server '{server}' timed out after {seconds}s")]
    TimedOut {
        tool: String,
        server: String,
        seconds: u64,
    },
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl From<McpCallError> for ToolError {
    fn from(error: McpCallError) -> Self {
        match error {
            McpCallError::TimedOut { .. } => ToolError::timeout(error.to_string()),
            McpCallError::Failed(error) => ToolError::execution(format!("{error:#}")),
        }
    }
}

/// Client side of one MCP server spoken to over a child process's stdio.
pub struct McpConnection {
    name: String,
    service: RwLock<Option<McpService>>,
    max_call_seconds: u64,
}

impl McpConnection {
    pub async fn connect_stdio(
        name: impl Into<String>,
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        max_call_seconds: u64,
    ) -> Result<Self> {
        let service = ()
            .serve(TokioChildProcess::new(Command::new(command).configure(
                |cmd| {
                    cmd.args(args);
                    cmd.envs(env.iter());
                },
            ))?)
            .await
            .with_context(|| format!("failed to start MCP server '{command}' over stdio"))?;

        Ok(Self {
            name: name.into(),
            service: RwLock::new(Some(service)),
            max_call_seconds,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn list_tools(&self) -> Result<Vec<rmcp::model::Tool>> {
        let guard = self.service.read().await;
        let service = guard
            .as_ref()
            .ok_or_else(|| anyhow!("MCP connection '{}' is not active", self.name))?;

        service
            .list_all_tools()
            .await
            .with_context(|| format!("failed to list tools of MCP server '{}'", self.name))
    }

    /// Call a tool. A result flagged `is_error` by the server is an error too.
    pub async fn call_tool(
        &self,
        tool_name: &str,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Vec<ToolContent>, McpCallError> {
        let request = CallToolRequestParams {
            meta: None,
            name: tool_name.to_string().into(),
            arguments: Some(arguments),
            task: None,
        };

        let guard = self.service.read().await;
        let service = guard
            .as_ref()
            .ok_or_else(|| anyhow!("MCP connection '{}' is not active", self.name))?;

        let result = within_call_limit(
            tool_name,
            &self.name,
            self.max_call_seconds,
            service.call_tool(request),
        )
        .await?
        .with_context(|| format!("MCP tool '{tool_name}' failed on server '{}'", self.name))?;

        let content = from_rmcp_contents(&result.content);
        if result.is_error == Some(true) {
            return Err(anyhow!(
                "MCP tool '{tool_name}' reported an error: {}",
                super::content::render_content_to_text(&content)
            )
            .into());
        }
        Ok(content)
    }

    pub async fn shutdown(&self) -> Result<()> {
        let service = self.service.write().await.take();
        if let Some(service) = service {
            service
                .cancel()
                .await
                .with_context(|| format!("failed to stop MCP server '{}'", self.name))?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn disconnected_for_test(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            service: RwLock::new(None),
            max_call_seconds: 30,
        }
    }
}

async fn within_call_limit<F: Future>(
    tool: &str,
    server: &str,
    seconds: u64,
    call: F,
) -> Result<F::Output, McpCallError> {
    tokio::time::timeout(Duration::from_secs(seconds), call)
        .await
        .map_err(|_| McpCallError::TimedOut {
            tool: tool.to_string(),
            server: server.to_string(),
            seconds,
        })
}
