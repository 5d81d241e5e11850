use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_call_timeout_secs() -> u64 {
    60
}

fn default_command_timeout_secs() -> u64 {
    20
}

fn default_cleanup_dirs() -> Vec<String> {
    vec!["/tmp".into()]
}

fn default_auth_log_path() -> String {
    "/var/log/auth.log".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Upper bound for any single tool invocation (default: 60)
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    /// Upper bound for external commands run by host tools (default: 20)
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    /// Directories `disk_cleanup` may delete stale files from
    #[serde(default = "default_cleanup_dirs")]
    pub cleanup_dirs: Vec<String>,
    #[serde(default = "default_auth_log_path")]
    pub auth_log_path: String,
    /// Built-in tools that are never registered
    #[serde(default)]
    pub disabled: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: default_call_timeout_secs(),
            command_timeout_secs: default_command_timeout_secs(),
            cleanup_dirs: default_cleanup_dirs(),
            auth_log_path: default_auth_log_path(),
            disabled: Vec::new(),
        }
    }
}

impl ToolsConfig {
    /// Cleanup directories with `~` expanded.
    pub fn expanded_cleanup_dirs(&self) -> Vec<PathBuf> {
        self.cleanup_dirs
            .iter()
            .map(|dir| PathBuf::from(shellexpand::tilde(dir).as_ref()))
            .collect()
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.call_timeout_secs == 0 {
            errors.push("tools.call_timeout_secs must be > 0".to_string());
        }
        if self.command_timeout_secs == 0 {
            errors.push("tools.command_timeout_secs must be > 0".to_string());
        }
        for dir in &self.cleanup_dirs {
            if dir.trim() == "/" || dir.trim().is_empty() {
                errors.push(format!("tools.cleanup_dirs may not contain '{dir}'"));
            }
        }
        errors
    }
}
