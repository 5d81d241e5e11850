use super::connection::McpConnection;
use super::proxy_tool::McpToolProxy;
use crate::config::{McpConfig, McpTransport};
use crate::tools::Tool;
use std::sync::Arc;

/// Live connections to the configured MCP servers and the tools they offer.
///
/// A server that fails to start or list its tools is skipped with a warning;
/// the rest of the process keeps running without it.
#[derive(Default)]
pub struct McpManager {
    connections: Vec<Arc<McpConnection>>,
    tools: Vec<Arc<dyn Tool>>,
}

impl McpManager {
    pub async fn from_config(config: &McpConfig) -> Self {
        let mut manager = Self::default();

        for server in config.enabled_servers() {
            let McpTransport::Stdio { command, args, env } = &server.transport;
            let connection = match McpConnection::connect_stdio(
                server.name.clone(),
                command,
                args,
                env,
                server.max_call_seconds,
            )
            .await
            {
                Ok(connection) => Arc::new(connection),
                Err(error) => {
                    tracing::warn!(server = %server.name, "MCP server unavailable: {error:#}");
                    continue;
                }
            };

            match connection.list_tools().await {
                Ok(server_tools) => {
                    for tool in server_tools {
                        let upstream = tool.name.into_owned();
                        let mutating = !server.is_read_only(&upstream);
                        let schema = serde_json::Value::Object(tool.input_schema.as_ref().clone());
                        let description = tool
                            .description
                            .map_or_else(String::new, std::borrow::Cow::into_owned);
                        manager.tools.push(Arc::new(McpToolProxy::new(
                            upstream,
                            description,
                            &schema,
                            mutating,
                            Arc::clone(&connection),
                        )));
                    }
                }
                Err(error) => {
                    tracing::warn!(server = %server.name, "MCP tool listing failed: {error:#}");
                }
            }
            tracing::info!(server = %server.name, "MCP server connected");
            manager.connections.push(connection);
        }

        manager
    }

    /// Proxies for every discovered tool, ready for registration.
    pub fn tools(&self) -> Vec<Arc<dyn Tool>> {
        self.tools.clone()
    }

    pub async fn shutdown(&self) {
        for connection in &self.connections {
            if let Err(error) = connection.shutdown().await {
                tracing::warn!(server = %connection.name(), "MCP shutdown failed: {error:#}");
            }
        }
    }
}
