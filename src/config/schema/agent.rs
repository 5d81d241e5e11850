use serde::{Deserialize, Serialize};

/// Upper bound on decision steps per user event, whatever the config says.
pub const MAX_STEPS_CAP: u32 = 25;

fn default_model() -> String {
    "gemini-2.5-flash".into()
}

fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}

fn default_max_steps() -> u32 {
    10
}

/// Decision policy (language model) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Gemini API key. Falls back to `GEMINI_API_KEY` / `GOOGLE_API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature (default: 0.0, deterministic audits)
    #[serde(default)]
    pub temperature: f64,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Decision steps per user event before the loop stops (default: 10)
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            temperature: 0.0,
            api_base: default_api_base(),
            max_steps: default_max_steps(),
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.model.trim().is_empty() {
            errors.push("agent.model cannot be empty".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            errors.push(format!(
                "agent.temperature must be within 0.0..=2.0, got {}",
                self.temperature
            ));
        }
        if !(1..=MAX_STEPS_CAP).contains(&self.max_steps) {
            errors.push(format!(
                "agent.max_steps must be within 1..={MAX_STEPS_CAP}, got {}",
                self.max_steps
            ));
        }
        errors
    }
}
