use super::traits::{Tool, ToolFuture, ToolInvoker};
use super::types::{ToolArguments, ToolDescriptor, ToolError};
use crate::error::RegistryError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Default upper bound for a single tool call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Central registry of tool instances.
///
/// Registration needs `&mut self`; once wrapped in an `Arc` and handed to
/// sessions the registry is read-only.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    call_timeout: Duration,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CALL_TIMEOUT)
    }
}

impl ToolRegistry {
    pub fn new(call_timeout: Duration) -> Self {
        Self {
            tools: HashMap::new(),
            call_timeout,
        }
    }

    /// Register a tool. Fails if a tool with the same name exists.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateTool { name });
        }
        tracing::debug!(
            tool = %name,
            mutating = tool.descriptor().mutating,
            "registered tool"
        );
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Register every tool, stopping at the first duplicate.
    pub fn register_all(
        &mut self,
        tools: impl IntoIterator<Item = Arc<dyn Tool>>,
    ) -> Result<(), RegistryError> {
        for tool in tools {
            self.register(tool)?;
        }
        Ok(())
    }

    /// Look up a tool descriptor by name.
    pub fn lookup(&self, name: &str) -> Result<&ToolDescriptor, RegistryError> {
        self.tools
            .get(name)
            .map(|tool| tool.descriptor())
            .ok_or_else(|| RegistryError::UnknownTool {
                name: name.to_string(),
            })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Return sorted list of registered tool names.
    pub fn tool_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Return descriptors for all registered tools, sorted by name.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        let mut descriptors: Vec<ToolDescriptor> = self
            .tools
            .values()
            .map(|tool| tool.descriptor().clone())
            .collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }
}

impl ToolInvoker for ToolRegistry {
    fn invoke<'a>(&'a self, tool_name: &'a str, arguments: &'a ToolArguments) -> ToolFuture<'a> {
        Box::pin(async move {
            let tool = self
                .tools
                .get(tool_name)
                .ok_or_else(|| ToolError::unavailable(format!("Tool not found: {tool_name}")))?;

            tool.descriptor().input_schema.validate(arguments)?;

            // Mutating calls are never cut off here; they bound their own work.
            if tool.descriptor().mutating {
                return tool.execute(arguments).await;
            }

            match tokio::time::timeout(self.call_timeout, tool.execute(arguments)).await {
                Ok(result) => result,
                Err(_) => Err(ToolError::timeout(format!(
                    "tool {tool_name} did not finish within {}s",
                    self.call_timeout.as_secs()
                ))),
            }
        })
    }
}
