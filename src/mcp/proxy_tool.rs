use super::connection::McpConnection;
use super::content::render_content_to_text;
use crate::tools::{
    InputSchema, Tool, ToolArguments, ToolDescriptor, ToolError, ToolFuture, ToolOutput,
};
use std::sync::Arc;

/// A remote MCP tool registered as `mcp_<server>_<tool>`.
pub struct McpToolProxy {
    descriptor: ToolDescriptor,
    upstream_name: String,
    server_name: String,
    connection: Arc<McpConnection>,
}

impl McpToolProxy {
    pub fn new(
        upstream_name: impl Into<String>,
        description: impl Into<String>,
        parameters_schema: &serde_json::Value,
        mutating: bool,
        connection: Arc<McpConnection>,
    ) -> Self {
        let upstream_name = upstream_name.into();
        let server_name = connection.name().to_string();
        let name = format!("mcp_{server_name}_{upstream_name}");
        let input_schema = InputSchema::from_json_schema(parameters_schema);
        let descriptor = if mutating {
            ToolDescriptor::mutating(name, description, input_schema)
        } else {
            ToolDescriptor::read_only(name, description, input_schema)
        };

        Self {
            descriptor,
            upstream_name,
            server_name,
            connection,
        }
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn upstream_tool_name(&self) -> &str {
        &self.upstream_name
    }
}

impl Tool for McpToolProxy {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn execute<'a>(&'a self, arguments: &'a ToolArguments) -> ToolFuture<'a> {
        Box::pin(async move {
            self.connection
                .call_tool(&self.upstream_name, arguments.clone())
                .await
                .map(|content| ToolOutput::text(render_content_to_text(&content)))
                .map_err(ToolError::from)
        })
    }
}
