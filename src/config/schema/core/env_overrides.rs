use super::Config;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("HOSTWARDEN_API_KEY")
            .or_else(|_| std::env::var("GEMINI_API_KEY"))
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            && !key.is_empty()
        {
            self.agent.api_key = Some(key);
        }

        if let Ok(model) = std::env::var("HOSTWARDEN_MODEL")
            && !model.is_empty()
        {
            self.agent.model = model;
        }

        if let Ok(port_str) = std::env::var("HOSTWARDEN_GATEWAY_PORT")
            && let Ok(port) = port_str.parse::<u16>()
        {
            self.gateway.port = port;
        }

        if let Ok(host) = std::env::var("HOSTWARDEN_GATEWAY_HOST")
            && !host.is_empty()
        {
            self.gateway.host = host;
        }

        if let Ok(secs_str) = std::env::var("HOSTWARDEN_APPROVAL_TIMEOUT_SECS")
            && let Ok(secs) = secs_str.parse::<u64>()
            && secs > 0
        {
            self.approval.timeout_secs = secs;
        }

        if let Ok(level) = std::env::var("HOSTWARDEN_LOG_LEVEL")
            && !level.is_empty()
        {
            self.log_level = level.to_lowercase();
        }
    }
}
