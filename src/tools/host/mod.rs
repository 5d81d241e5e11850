//! Built-in host inspection and maintenance tools.
//!
//! Read-only tools report on the operating system, resources, network
//! exposure, startup programs and processes. `kill_process` and
//! `disk_cleanup` mutate the host and are therefore only ever run behind the
//! approval gate.

mod cleanup;
mod command;
mod network;
mod processes;
mod startup;
mod system;

use crate::config::ToolsConfig;
use crate::tools::traits::{Tool, ToolFuture};
use crate::tools::types::{ToolArguments, ToolDescriptor, ToolError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub(crate) use command::run_command;

/// Settings shared by all host tools.
#[derive(Debug, Clone)]
pub struct HostContext {
    pub command_timeout: Duration,
    pub cleanup_dirs: Vec<PathBuf>,
    pub auth_log_path: PathBuf,
    /// XDG autostart directories, system first, user last.
    pub autostart_dirs: Vec<PathBuf>,
}

impl HostContext {
    pub fn from_config(config: &ToolsConfig) -> Self {
        Self {
            command_timeout: Duration::from_secs(config.command_timeout_secs),
            cleanup_dirs: config.expanded_cleanup_dirs(),
            auth_log_path: PathBuf::from(shellexpand::tilde(&config.auth_log_path).as_ref()),
            autostart_dirs: default_autostart_dirs(),
        }
    }
}

fn default_autostart_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![PathBuf::from("/etc/xdg/autostart")];
    if let Some(base) = directories::BaseDirs::new() {
        dirs.push(base.config_dir().join("autostart"));
    }
    dirs
}

type Handler = for<'a> fn(&'a HostContext, &'a ToolArguments) -> ToolFuture<'a>;

/// A host tool: descriptor plus a handler function over the shared context.
pub struct HostTool {
    descriptor: ToolDescriptor,
    ctx: Arc<HostContext>,
    handler: Handler,
}

impl HostTool {
    fn new(descriptor: ToolDescriptor, ctx: &Arc<HostContext>, handler: Handler) -> Self {
        Self {
            descriptor,
            ctx: Arc::clone(ctx),
            handler,
        }
    }
}

impl Tool for HostTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn execute<'a>(&'a self, arguments: &'a ToolArguments) -> ToolFuture<'a> {
        (self.handler)(&self.ctx, arguments)
    }
}

/// Every built-in host tool, minus the names listed in `disabled`.
pub fn host_tools(ctx: HostContext, disabled: &[String]) -> Vec<Arc<dyn Tool>> {
    let ctx = Arc::new(ctx);
    let mut tools = Vec::new();
    tools.extend(system::tools(&ctx));
    tools.extend(network::tools(&ctx));
    tools.extend(processes::tools(&ctx));
    tools.extend(startup::tools(&ctx));
    tools.extend(cleanup::tools(&ctx));

    tools
        .into_iter()
        .filter(|tool| !disabled.iter().any(|name| name == &tool.descriptor.name))
        .map(|tool| Arc::new(tool) as Arc<dyn Tool>)
        .collect()
}

/// Read an optional integer argument bounded to `min..=max`.
fn bounded_count(
    arguments: &ToolArguments,
    field: &str,
    default: u64,
    min: u64,
    max: u64,
) -> Result<u64, ToolError> {
    let Some(value) = arguments.get(field).filter(|value| !value.is_null()) else {
        return Ok(default);
    };
    let count = value
        .as_u64()
        .ok_or_else(|| ToolError::invalid_arguments(format!("'{field}' must be >= {min}")))?;
    if !(min..=max).contains(&count) {
        return Err(ToolError::invalid_arguments(format!(
            "'{field}' must be between {min} and {max}"
        )));
    }
    Ok(count)
}

fn linux_only(tool: &str) -> Result<(), ToolError> {
    if cfg!(target_os = "linux") {
        Ok(())
    } else {
        Err(ToolError::unavailable(format!(
            "{tool} is only supported on Linux hosts"
        )))
    }
}

#[cfg(test)]
pub(crate) fn test_context(cleanup_dir: PathBuf) -> HostContext {
    HostContext {
        command_timeout: Duration::from_secs(5),
        cleanup_dirs: vec![cleanup_dir],
        auth_log_path: PathBuf::from("/var/log/auth.log"),
        autostart_dirs: Vec::new(),
    }
}
