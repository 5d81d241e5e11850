use super::{HostContext, HostTool, linux_only, run_command};
use crate::tools::schema::{FieldKind, FieldSpec, InputSchema};
use crate::tools::traits::ToolFuture;
use crate::tools::types::{ToolArguments, ToolDescriptor, ToolError, ToolOutput};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
/// Interval between the two `/proc/stat` samples used for CPU usage.
const CPU_SAMPLE_INTERVAL: Duration = Duration::from_millis(250);

pub(super) fn tools(ctx: &Arc<HostContext>) -> Vec<HostTool> {
    vec![
        HostTool::new(
            ToolDescriptor::read_only(
                "get_os_info",
                "Get operating system name, release, kernel version, architecture and hostname.",
                InputSchema::empty(),
            ),
            ctx,
            os_info,
        ),
        HostTool::new(
            ToolDescriptor::read_only(
                "get_cpu_info",
                "Get CPU usage, core count and load averages.",
                InputSchema::empty(),
            ),
            ctx,
            cpu_info,
        ),
        HostTool::new(
            ToolDescriptor::read_only(
                "get_memory_info",
                "Get RAM and swap usage. High RAM together with growing swap indicates thrashing.",
                InputSchema::empty(),
            ),
            ctx,
            memory_info,
        ),
        HostTool::new(
            ToolDescriptor::read_only(
                "get_disk_info",
                "Get total, used and free disk space for a mount point (default: /).",
                InputSchema::empty().field(
                    FieldSpec::optional("path", FieldKind::String)
                        .describe("Mount point or directory to inspect"),
                ),
            ),
            ctx,
            disk_info,
        ),
        HostTool::new(
            ToolDescriptor::read_only(
                "get_system_resources",
                "Get a one-shot snapshot of CPU, memory, swap and root filesystem usage \
                 as percentages.",
                InputSchema::empty(),
            ),
            ctx,
            system_resources,
        ),
    ]
}

fn os_info<'a>(_ctx: &'a HostContext, _arguments: &'a ToolArguments) -> ToolFuture<'a> {
    Box::pin(async move {
        let release = tokio::fs::read_to_string("/etc/os-release")
            .await
            .ok()
            .and_then(|text| parse_os_release(&text).remove("PRETTY_NAME"));
        let kernel = tokio::fs::read_to_string("/proc/sys/kernel/osrelease")
            .await
            .ok()
            .map(|text| text.trim().to_string());
        let hostname = hostname::get()
            .ok()
            .map(|name| name.to_string_lossy().into_owned());

        Ok(ToolOutput::json(json!({
            "os": std::env::consts::OS,
            "family": std::env::consts::FAMILY,
            "architecture": std::env::consts::ARCH,
            "release": release,
            "kernel": kernel,
            "hostname": hostname,
        })))
    })
}

fn cpu_info<'a>(_ctx: &'a HostContext, _arguments: &'a ToolArguments) -> ToolFuture<'a> {
    Box::pin(async move {
        linux_only("get_cpu_info")?;
        let cores = std::thread::available_parallelism().map_or(1, std::num::NonZero::get);

        let first = read_cpu_sample().await?;
        tokio::time::sleep(CPU_SAMPLE_INTERVAL).await;
        let second = read_cpu_sample().await?;
        let usage_percent = cpu_usage_percent(first, second);

        let loadavg = tokio::fs::read_to_string("/proc/loadavg")
            .await
            .map_err(|e| ToolError::execution(format!("failed to read /proc/loadavg: {e}")))?;
        let load: Vec<f64> = loadavg
            .split_whitespace()
            .take(3)
            .filter_map(|field| field.parse().ok())
            .collect();

        Ok(ToolOutput::json(json!({
            "usage_percent": usage_percent,
            "cores": cores,
            "load_average": load,
        })))
    })
}

fn memory_info<'a>(_ctx: &'a HostContext, _arguments: &'a ToolArguments) -> ToolFuture<'a> {
    Box::pin(async move {
        linux_only("get_memory_info")?;
        let report = read_meminfo().await?;
        Ok(ToolOutput::json(report.to_json()))
    })
}

fn disk_info<'a>(ctx: &'a HostContext, arguments: &'a ToolArguments) -> ToolFuture<'a> {
    Box::pin(async move {
        let path = arguments
            .get("path")
            .and_then(Value::as_str)
            .unwrap_or("/");
        let stdout = run_command("df", &["-Pk", path], ctx.command_timeout).await?;
        let usage = parse_df(&stdout)
            .ok_or_else(|| ToolError::execution(format!("could not parse df output for {path}")))?;
        Ok(ToolOutput::json(json!({
            "filesystem": usage.filesystem,
            "mount_point": usage.mount_point,
            "total_gb": round2(usage.total_kb as f64 / (1024.0 * 1024.0)),
            "used_gb": round2(usage.used_kb as f64 / (1024.0 * 1024.0)),
            "free_gb": round2(usage.available_kb as f64 / (1024.0 * 1024.0)),
            "low_space": usage.available_kb < 10 * 1024 * 1024,
        })))
    })
}

fn system_resources<'a>(ctx: &'a HostContext, _arguments: &'a ToolArguments) -> ToolFuture<'a> {
    Box::pin(async move {
        linux_only("get_system_resources")?;
        let first = read_cpu_sample().await?;
        tokio::time::sleep(CPU_SAMPLE_INTERVAL).await;
        let second = read_cpu_sample().await?;
        let memory = read_meminfo().await?;

        let root = match run_command("df", &["-Pk", "/"], ctx.command_timeout).await {
            Ok(stdout) => parse_df(&stdout),
            Err(error) => {
                tracing::debug!(%error, "root filesystem usage unavailable");
                None
            }
        };

        Ok(ToolOutput::json(resource_snapshot(
            cpu_usage_percent(first, second),
            &memory,
            root.as_ref(),
        )))
    })
}

fn resource_snapshot(cpu_percent: f64, memory: &MemoryReport, root: Option<&DiskUsage>) -> Value {
    json!({
        "cpu_percent": cpu_percent,
        "memory_percent": memory.used_percent(),
        "swap_percent": memory.swap_used_percent(),
        "root_disk_percent": root.map(DiskUsage::used_percent),
    })
}

fn parse_os_release(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().trim_matches('"').to_string()))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CpuSample {
    idle: u64,
    total: u64,
}

async fn read_cpu_sample() -> Result<CpuSample, ToolError> {
    let text = tokio::fs::read_to_string("/proc/stat")
        .await
        .map_err(|e| ToolError::execution(format!("failed to read /proc/stat: {e}")))?;
    text.lines()
        .next()
        .and_then(parse_cpu_line)
        .ok_or_else(|| ToolError::execution("unexpected /proc/stat format"))
}

/// Parse the aggregate `cpu` line of `/proc/stat`. Idle time includes iowait.
fn parse_cpu_line(line: &str) -> Option<CpuSample> {
    let mut fields = line.split_whitespace();
    if fields.next()? != "cpu" {
        return None;
    }
    let values: Vec<u64> = fields.filter_map(|field| field.parse().ok()).collect();
    if values.len() < 4 {
        return None;
    }
    let idle = values[3] + values.get(4).copied().unwrap_or(0);
    Some(CpuSample {
        idle,
        total: values.iter().sum(),
    })
}

fn cpu_usage_percent(first: CpuSample, second: CpuSample) -> f64 {
    let total = second.total.saturating_sub(first.total);
    if total == 0 {
        return 0.0;
    }
    let idle = second.idle.saturating_sub(first.idle);
    round2(100.0 * (total - idle) as f64 / total as f64)
}

async fn read_meminfo() -> Result<MemoryReport, ToolError> {
    let text = tokio::fs::read_to_string("/proc/meminfo")
        .await
        .map_err(|e| ToolError::execution(format!("failed to read /proc/meminfo: {e}")))?;
    MemoryReport::from_meminfo(&text)
        .ok_or_else(|| ToolError::execution("unexpected /proc/meminfo format"))
}

#[derive(Debug, Clone, PartialEq)]
struct MemoryReport {
    total_kb: u64,
    available_kb: u64,
    swap_total_kb: u64,
    swap_free_kb: u64,
}

impl MemoryReport {
    fn from_meminfo(text: &str) -> Option<Self> {
        let fields: HashMap<&str, u64> = text
            .lines()
            .filter_map(|line| {
                let (key, rest) = line.split_once(':')?;
                let value = rest.split_whitespace().next()?.parse().ok()?;
                Some((key.trim(), value))
            })
            .collect();

        Some(Self {
            total_kb: *fields.get("MemTotal")?,
            available_kb: *fields.get("MemAvailable")?,
            swap_total_kb: fields.get("SwapTotal").copied().unwrap_or(0),
            swap_free_kb: fields.get("SwapFree").copied().unwrap_or(0),
        })
    }

    fn used_percent(&self) -> f64 {
        percent(self.total_kb.saturating_sub(self.available_kb), self.total_kb)
    }

    fn swap_used_percent(&self) -> f64 {
        percent(
            self.swap_total_kb.saturating_sub(self.swap_free_kb),
            self.swap_total_kb,
        )
    }

    fn to_json(&self) -> Value {
        let kb_to_gb = |kb: u64| round2(kb as f64 * 1024.0 / GIB);
        json!({
            "total_gb": kb_to_gb(self.total_kb),
            "used_gb": kb_to_gb(self.total_kb.saturating_sub(self.available_kb)),
            "available_gb": kb_to_gb(self.available_kb),
            "used_percent": self.used_percent(),
            "swap_total_gb": kb_to_gb(self.swap_total_kb),
            "swap_used_gb": kb_to_gb(self.swap_total_kb.saturating_sub(self.swap_free_kb)),
            "swap_used_percent": self.swap_used_percent(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DiskUsage {
    filesystem: String,
    total_kb: u64,
    used_kb: u64,
    available_kb: u64,
    mount_point: String,
}

impl DiskUsage {
    /// Matches df's capacity column: used over used plus available.
    fn used_percent(&self) -> f64 {
        percent(self.used_kb, self.used_kb + self.available_kb)
    }
}

/// Parse POSIX `df -Pk` output (header line, then one data line).
fn parse_df(stdout: &str) -> Option<DiskUsage> {
    let line = stdout.lines().nth(1)?;
    let cols: Vec<&str> = line.split_whitespace().collect();
    if cols.len() < 6 {
        return None;
    }
    Some(DiskUsage {
        filesystem: cols[0].to_string(),
        total_kb: cols[1].parse().ok()?,
        used_kb: cols[2].parse().ok()?,
        available_kb: cols[3].parse().ok()?,
        mount_point: cols[5..].join(" "),
    })
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2(100.0 * part as f64 / whole as f64)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
