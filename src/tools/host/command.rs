use crate::tools::types::ToolError;
use std::time::Duration;

/// Maximum output size kept from a command (256 KB).
const MAX_OUTPUT_BYTES: usize = 262_144;
/// Environment variables safe to pass to host commands.
/// Only functional variables are included -- never API keys or secrets.
const SAFE_ENV_VARS: &[&str] = &["PATH", "HOME", "LANG", "LC_ALL", "LC_CTYPE", "USER"];

/// Run `program args..` with a cleared environment and a hard timeout.
///
/// A missing binary maps to `unavailable`, a non-zero exit to
/// `execution_failure` carrying stderr.
pub(crate) async fn run_command(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<String, ToolError> {
    let mut cmd = tokio::process::Command::new(program);
    cmd.args(args).env_clear().kill_on_drop(true);
    for var in SAFE_ENV_VARS {
        if let Ok(val) = std::env::var(var) {
            cmd.env(var, val);
        }
    }

    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(error)) if error.kind() == std::io::ErrorKind::NotFound => {
            return Err(ToolError::unavailable(format!(
                "{program} is not installed on this host"
            )));
        }
        Ok(Err(error)) => {
            return Err(ToolError::execution(format!(
                "failed to execute {program}: {error}"
            )));
        }
        Err(_) => {
            return Err(ToolError::timeout(format!(
                "{program} timed out after {}s and was killed",
                timeout.as_secs()
            )));
        }
    };

    let stdout = truncate_output(String::from_utf8_lossy(&output.stdout).into_owned());
    if output.status.success() {
        return Ok(stdout);
    }

    let stderr = truncate_output(String::from_utf8_lossy(&output.stderr).into_owned());
    let detail = if stderr.trim().is_empty() {
        stdout
    } else {
        stderr
    };
    Err(ToolError::execution(format!(
        "{program} exited with {}: {}",
        output.status,
        detail.trim()
    )))
}

fn truncate_output(mut text: String) -> String {
    if text.len() > MAX_OUTPUT_BYTES {
        text.truncate(text.floor_char_boundary(MAX_OUTPUT_BYTES));
        text.push_str("\n... [output truncated at 256KB]");
    }
    text
}
