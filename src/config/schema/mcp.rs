use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

fn default_max_call_seconds() -> u64 {
    30
}

fn default_enabled_true() -> bool {
    true
}

/// External MCP tool servers bridged into the registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub servers: Vec<McpServerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Unique name; prefixes every tool as `mcp_<name>_<tool>`.
    pub name: String,

    #[serde(default)]
    pub transport: McpTransport,

    #[serde(default = "default_enabled_true")]
    pub enabled: bool,

    /// Maximum seconds per tool call.
    #[serde(default = "default_max_call_seconds")]
    pub max_call_seconds: u64,

    /// Server tool names (unprefixed) that have no side effects. Every other
    /// tool from this server is treated as mutating.
    #[serde(default)]
    pub read_only_tools: Vec<String>,
}

impl McpServerConfig {
    pub fn is_read_only(&self, tool: &str) -> bool {
        self.read_only_tools.iter().any(|name| name == tool)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum McpTransport {
    /// Spawns the server as a child process speaking MCP over stdio.
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
    },
}

impl Default for McpTransport {
    fn default() -> Self {
        Self::Stdio {
            command: String::new(),
            args: Vec::new(),
            env: HashMap::new(),
        }
    }
}

impl McpConfig {
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut names: HashSet<&str> = HashSet::new();

        for server in &self.servers {
            if server.name.is_empty() {
                errors.push("MCP server name cannot be empty".to_string());
            }
            if !names.insert(server.name.as_str()) {
                errors.push(format!("Duplicate MCP server name: {}", server.name));
            }
            match &server.transport {
                McpTransport::Stdio { command, .. } => {
                    if command.is_empty() {
                        errors.push(format!(
                            "MCP server '{}': stdio transport requires a command",
                            server.name
                        ));
                    }
                }
            }
            if server.max_call_seconds == 0 {
                errors.push(format!(
                    "MCP server '{}': max_call_seconds must be > 0",
                    server.name
                ));
            }
        }

        errors
    }

    #[must_use]
    pub fn enabled_servers(&self) -> Vec<&McpServerConfig> {
        if !self.enabled {
            return Vec::new();
        }
        self.servers
            .iter()
            .filter(|server| server.enabled)
            .collect()
    }
}
