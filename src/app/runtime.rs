use crate::agent::{AgentLoop, GeminiPolicy};
use crate::config::Config;
use crate::session::{SessionManager, SessionSettings};
use crate::tools::{HostContext, ToolRegistry, host_tools};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

/// Tools wired from config: built-in host tools plus any MCP bridges.
pub struct Runtime {
    registry: Arc<ToolRegistry>,
    #[cfg(feature = "mcp")]
    mcp: crate::mcp::McpManager,
}

impl Runtime {
    pub async fn load_tools(config: &Config) -> Result<Self> {
        let mut registry = ToolRegistry::new(Duration::from_secs(config.tools.call_timeout_secs));
        registry
            .register_all(host_tools(
                HostContext::from_config(&config.tools),
                &config.tools.disabled,
            ))
            .context("failed to register host tools")?;

        #[cfg(feature = "mcp")]
        let mcp = {
            let mcp = crate::mcp::McpManager::from_config(&config.mcp).await;
            registry
                .register_all(mcp.tools())
                .context("failed to register MCP tools")?;
            mcp
        };
        #[cfg(not(feature = "mcp"))]
        if !config.mcp.enabled_servers().is_empty() {
            tracing::warn!("MCP servers are configured but hostwarden was built without the `mcp` feature");
        }

        tracing::info!(tools = registry.len(), "tool registry ready");
        Ok(Self {
            registry: Arc::new(registry),
            #[cfg(feature = "mcp")]
            mcp,
        })
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Build the Gemini-backed session manager. Fails without an API key.
    pub fn session_manager(&self, config: &Config) -> Result<SessionManager> {
        let policy = GeminiPolicy::new(&config.agent, self.registry.descriptors())
            .context("failed to set up the Gemini policy (set GEMINI_API_KEY or [agent] api_key)")?;
        tracing::info!(model = %config.agent.model, "decision policy ready");

        let agent = AgentLoop::new(
            Arc::new(policy),
            Arc::clone(&self.registry),
            config.agent.max_steps,
        );
        Ok(
            SessionManager::new(Arc::new(agent), SessionSettings::from(&config.approval))
                .with_audit_dir(config.audit.audit_dir()),
        )
    }

    pub async fn shutdown(&self) {
        #[cfg(feature = "mcp")]
        self.mcp.shutdown().await;
    }
}
