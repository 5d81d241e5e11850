use super::super::{AgentConfig, ApprovalConfig, AuditConfig, GatewayConfig, McpConfig, ToolsConfig};
use crate::error::ConfigError;
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_log_level() -> String {
    "info".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory (`~/.hostwarden`) - computed from home, not serialized
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    /// trace, debug, info, warn or error (default: info)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub approval: ApprovalConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub audit: AuditConfig,

    #[serde(default)]
    pub mcp: McpConfig,
}

impl Default for Config {
    fn default() -> Self {
        let home =
            UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());
        let data_dir = home.join(".hostwarden");

        Self {
            config_path: data_dir.join("config.toml"),
            data_dir,
            log_level: default_log_level(),
            agent: AgentConfig::default(),
            approval: ApprovalConfig::default(),
            gateway: GatewayConfig::default(),
            tools: ToolsConfig::default(),
            audit: AuditConfig::default(),
            mcp: McpConfig::default(),
        }
    }
}

impl Config {
    /// Check cross-section invariants; all problems are reported at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        if !matches!(
            self.log_level.as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            errors.push(format!("log_level '{}' is not a valid level", self.log_level));
        }
        errors.extend(self.agent.validate());
        if self.approval.timeout_secs == 0 {
            errors.push("approval.timeout_secs must be > 0".to_string());
        }
        if !self.gateway.is_local_bind() && !self.gateway.allow_public_bind {
            errors.push(format!(
                "gateway.host '{}' is not local; set gateway.allow_public_bind = true to expose it",
                self.gateway.host
            ));
        }
        errors.extend(self.tools.validate());
        errors.extend(self.mcp.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }
}
