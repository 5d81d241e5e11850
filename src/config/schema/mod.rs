mod agent;
mod approval;
mod audit;
mod core;
mod gateway;
mod mcp;
mod tools;

pub use agent::{AgentConfig, MAX_STEPS_CAP};
pub use approval::ApprovalConfig;
pub use audit::AuditConfig;
pub use core::Config;
pub use gateway::GatewayConfig;
#[allow(unused_imports)]
pub use mcp::{McpConfig, McpServerConfig, McpTransport};
pub use tools::ToolsConfig;
