use super::types::{ToolArguments, ToolDescriptor, ToolError, ToolOutput};
use std::future::Future;
use std::pin::Pin;

pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<ToolOutput, ToolError>> + Send + 'a>>;

/// Core tool trait, implemented by every host capability
pub trait Tool: Send + Sync {
    /// Name, input schema and risk classification
    fn descriptor(&self) -> &ToolDescriptor;

    /// Execute the tool with already-validated arguments
    fn execute<'a>(&'a self, arguments: &'a ToolArguments) -> ToolFuture<'a>;

    fn name(&self) -> &str {
        &self.descriptor().name
    }
}

/// The uniform boundary through which the agent reaches every tool.
pub trait ToolInvoker: Send + Sync {
    fn invoke<'a>(&'a self, tool_name: &'a str, arguments: &'a ToolArguments) -> ToolFuture<'a>;
}
