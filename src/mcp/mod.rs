//! MCP (Model Context Protocol) client bridge.
//!
//! Tools exposed by external MCP servers are registered next to the host
//! tools and go through the same approval rules.

pub mod connection;
pub mod content;
pub mod manager;
pub mod proxy_tool;

pub use connection::{McpCallError, McpConnection};
pub use manager::McpManager;
pub use proxy_tool::McpToolProxy;
