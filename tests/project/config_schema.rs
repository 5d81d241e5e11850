use hostwarden::config::{Config, McpTransport};
use hostwarden::session::SessionSettings;
use std::time::Duration;

#[test]
fn full_config_deserializes() {
    let toml = r#"
log_level = "debug"

[agent]
model = "gemini-2.5-pro"
temperature = 0.2
max_steps = 6

[approval]
timeout_secs = 45
resume_after_decline = false

[gateway]
port = 4100
host = "127.0.0.1"

[tools]
disabled = ["kill_process"]
cleanup_dirs = ["/tmp", "/var/tmp"]

[audit]
enabled = true

[mcp]
enabled = true

[[mcp.servers]]
name = "fs"
read_only_tools = ["read_file"]

[mcp.servers.transport]
kind = "stdio"
command = "mcp-fs"
args = ["--root", "/srv"]
"#;

    let parsed: Config = toml::from_str(toml).expect("full config should deserialize");

    assert!(parsed.validate().is_ok());
    assert_eq!(parsed.log_level, "debug");
    assert_eq!(parsed.agent.model, "gemini-2.5-pro");
    assert_eq!(parsed.agent.max_steps, 6);
    assert_eq!(parsed.gateway.port, 4100);
    assert_eq!(parsed.tools.disabled, vec!["kill_process"]);
    assert_eq!(parsed.mcp.enabled_servers().len(), 1);
    let server = &parsed.mcp.servers[0];
    assert!(server.is_read_only("read_file"));
    assert!(!server.is_read_only("write_file"));
    let McpTransport::Stdio { command, args, .. } = &server.transport;
    assert_eq!(command, "mcp-fs");
    assert_eq!(args, &["--root", "/srv"]);
}

#[test]
fn approval_section_drives_session_settings() {
    let parsed: Config = toml::from_str("[approval]\ntimeout_secs = 45\nresume_after_decline = false\n")
        .expect("approval section should deserialize");

    let settings = SessionSettings::from(&parsed.approval);

    assert_eq!(settings.approval_timeout, Duration::from_secs(45));
    assert!(!settings.resume_after_decline);
}

#[test]
fn public_bind_without_opt_in_fails_validation() {
    let parsed: Config =
        toml::from_str("[gateway]\nhost = \"0.0.0.0\"\n").expect("gateway section should deserialize");

    let err = parsed.validate().unwrap_err().to_string();
    assert!(err.contains("allow_public_bind"));
}

#[test]
fn mcp_server_without_command_fails_validation() {
    let toml = r#"
[mcp]
enabled = true

[[mcp.servers]]
name = "broken"
"#;
    let parsed: Config = toml::from_str(toml).expect("mcp section should deserialize");

    let err = parsed.validate().unwrap_err().to_string();
    assert!(err.contains("requires a command"));
}
