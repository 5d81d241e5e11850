use super::{HostContext, HostTool, bounded_count, linux_only, run_command};
use crate::tools::schema::{FieldKind, FieldSpec, InputSchema};
use crate::tools::traits::ToolFuture;
use crate::tools::types::{ToolArguments, ToolDescriptor, ToolError, ToolOutput};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;

pub(super) fn tools(ctx: &Arc<HostContext>) -> Vec<HostTool> {
    vec![
        HostTool::new(
            ToolDescriptor::read_only(
                "get_heavy_processes",
                "Return the top N processes by CPU usage, with memory share. \
                 Useful for identifying resource hogs.",
                InputSchema::empty().field(
                    FieldSpec::optional("count", FieldKind::Integer)
                        .describe("Number of processes to return (1-50, default 5)"),
                ),
            ),
            ctx,
            heavy_processes,
        ),
        HostTool::new(
            ToolDescriptor::read_only(
                "get_zombie_processes",
                "Find zombie processes: exited children their parent never reaped.",
                InputSchema::empty(),
            ),
            ctx,
            zombie_processes,
        ),
        HostTool::new(
            ToolDescriptor::read_only(
                "get_update_info",
                "List packages with pending upgrades (apt).",
                InputSchema::empty(),
            ),
            ctx,
            update_info,
        ),
        HostTool::new(
            ToolDescriptor::mutating(
                "kill_process",
                "Terminate a process by pid. Sends SIGTERM, or SIGKILL when force is true.",
                InputSchema::empty()
                    .field(
                        FieldSpec::required("pid", FieldKind::Integer)
                            .describe("Process id to terminate"),
                    )
                    .field(
                        FieldSpec::optional("force", FieldKind::Boolean)
                            .describe("Send SIGKILL instead of SIGTERM"),
                    ),
            ),
            ctx,
            kill_process,
        ),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct ProcessUsage {
    pid: u32,
    name: String,
    cpu_percent: f64,
    memory_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct ZombieProcess {
    pid: u32,
    ppid: u32,
    name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct PendingUpgrade {
    package: String,
    candidate: String,
    installed: Option<String>,
}

fn heavy_processes<'a>(ctx: &'a HostContext, arguments: &'a ToolArguments) -> ToolFuture<'a> {
    Box::pin(async move {
        let count = bounded_count(arguments, "count", 5, 1, 50)?;
        let stdout = run_command(
            "ps",
            &["-eo", "pid=,comm=,%cpu=,%mem=", "--sort=-%cpu"],
            ctx.command_timeout,
        )
        .await?;
        let processes: Vec<ProcessUsage> = stdout
            .lines()
            .filter_map(parse_usage_line)
            .take(usize::try_from(count).unwrap_or(usize::MAX))
            .collect();
        Ok(ToolOutput::json(to_value(&processes)?))
    })
}

fn zombie_processes<'a>(ctx: &'a HostContext, _arguments: &'a ToolArguments) -> ToolFuture<'a> {
    Box::pin(async move {
        let stdout = run_command("ps", &["-eo", "pid=,ppid=,stat=,comm="], ctx.command_timeout)
            .await?;
        let zombies = parse_zombies(&stdout);
        if zombies.is_empty() {
            return Ok(ToolOutput::text("No zombie processes found."));
        }
        Ok(ToolOutput::json(to_value(&zombies)?))
    })
}

fn update_info<'a>(ctx: &'a HostContext, _arguments: &'a ToolArguments) -> ToolFuture<'a> {
    Box::pin(async move {
        linux_only("get_update_info")?;
        let stdout = run_command("apt", &["list", "--upgradable"], ctx.command_timeout).await?;
        let upgrades = parse_apt_upgradable(&stdout);
        Ok(ToolOutput::json(json!({
            "pending": upgrades.len(),
            "packages": to_value(&upgrades)?,
        })))
    })
}

fn kill_process<'a>(ctx: &'a HostContext, arguments: &'a ToolArguments) -> ToolFuture<'a> {
    Box::pin(async move {
        let pid = arguments
            .get("pid")
            .and_then(Value::as_i64)
            .ok_or_else(|| ToolError::invalid_arguments("'pid' must be an integer"))?;
        if pid <= 1 {
            return Err(ToolError::invalid_arguments(format!(
                "refusing to signal pid {pid}"
            )));
        }
        if u32::try_from(pid).is_ok_and(|pid| pid == std::process::id()) {
            return Err(ToolError::invalid_arguments(
                "refusing to terminate the assistant itself",
            ));
        }
        let force = arguments
            .get("force")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let signal = if force { "-KILL" } else { "-TERM" };

        let pid_arg = pid.to_string();
        run_command("kill", &[signal, &pid_arg], ctx.command_timeout).await?;
        tracing::info!(pid, signal, "signalled process");
        Ok(ToolOutput::json(json!({
            "pid": pid,
            "signal": signal.trim_start_matches('-'),
            "status": "signalled",
        })))
    })
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value)
        .map_err(|e| ToolError::execution(format!("failed to serialize result: {e}")))
}

/// Parse a `pid comm %cpu %mem` line; `comm` may contain spaces.
fn parse_usage_line(line: &str) -> Option<ProcessUsage> {
    let cols: Vec<&str> = line.split_whitespace().collect();
    if cols.len() < 4 {
        return None;
    }
    let last = cols.len() - 1;
    Some(ProcessUsage {
        pid: cols[0].parse().ok()?,
        name: cols[1..last - 1].join(" "),
        cpu_percent: cols[last - 1].parse().ok()?,
        memory_percent: cols[last].parse().ok()?,
    })
}

fn parse_zombies(stdout: &str) -> Vec<ZombieProcess> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let pid = cols.next()?.parse().ok()?;
            let ppid = cols.next()?.parse().ok()?;
            let stat = cols.next()?;
            if !stat.starts_with('Z') {
                return None;
            }
            Some(ZombieProcess {
                pid,
                ppid,
                name: cols.collect::<Vec<_>>().join(" "),
            })
        })
        .collect()
}

/// Parse `apt list --upgradable` lines such as
/// `openssl/jammy-updates 3.0.2-0ubuntu1.15 amd64 [upgradable from: 3.0.2-0ubuntu1.14]`.
fn parse_apt_upgradable(stdout: &str) -> Vec<PendingUpgrade> {
    stdout
        .lines()
        .filter(|line| line.contains('/'))
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let package = cols.next()?.split('/').next()?.to_string();
            let candidate = cols.next()?.to_string();
            let installed = line
                .split_once("upgradable from: ")
                .map(|(_, rest)| rest.trim_end_matches(']').trim().to_string());
            Some(PendingUpgrade {
                package,
                candidate,
                installed,
            })
        })
        .collect()
}
