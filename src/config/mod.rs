pub mod schema;

pub use schema::{
    AgentConfig, ApprovalConfig, AuditConfig, Config, GatewayConfig, McpConfig, McpServerConfig,
    McpTransport, ToolsConfig,
};
