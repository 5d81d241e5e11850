use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_audit_dir() -> String {
    "~/.hostwarden/transcripts".into()
}

/// JSONL transcript persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_audit_dir")]
    pub dir: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_audit_dir(),
        }
    }
}

impl AuditConfig {
    /// Directory for transcripts when auditing is enabled.
    pub fn audit_dir(&self) -> Option<PathBuf> {
        self.enabled
            .then(|| PathBuf::from(shellexpand::tilde(&self.dir).as_ref()))
    }
}
