use super::{HostContext, HostTool, linux_only, run_command};
use crate::tools::schema::InputSchema;
use crate::tools::traits::ToolFuture;
use crate::tools::types::{ToolArguments, ToolDescriptor, ToolError, ToolOutput};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub(super) fn tools(ctx: &Arc<HostContext>) -> Vec<HostTool> {
    vec![HostTool::new(
        ToolDescriptor::read_only(
            "get_startup_apps",
            "List programs started automatically: desktop autostart entries and \
             enabled systemd services. Useful for spotting persistence.",
            InputSchema::empty(),
        ),
        ctx,
        startup_apps,
    )]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct AutostartEntry {
    name: String,
    exec: Option<String>,
    enabled: bool,
    source: PathBuf,
}

fn startup_apps<'a>(ctx: &'a HostContext, _arguments: &'a ToolArguments) -> ToolFuture<'a> {
    Box::pin(async move {
        linux_only("get_startup_apps")?;
        let autostart = read_autostart_dirs(&ctx.autostart_dirs).await;

        let (services, services_error) = match run_command(
            "systemctl",
            &[
                "list-unit-files",
                "--type=service",
                "--state=enabled",
                "--no-legend",
                "--no-pager",
            ],
            ctx.command_timeout,
        )
        .await
        {
            Ok(stdout) => (Some(parse_enabled_units(&stdout)), None),
            Err(error) => (None, Some(error.message)),
        };

        let autostart = serde_json::to_value(&autostart)
            .map_err(|e| ToolError::execution(format!("failed to serialize entries: {e}")))?;
        Ok(ToolOutput::json(json!({
            "autostart": autostart,
            "services": services,
            "services_error": services_error,
        })))
    })
}

/// Collect `.desktop` entries. A file in a later directory replaces one with
/// the same name in an earlier directory, so user entries shadow system ones.
async fn read_autostart_dirs(dirs: &[PathBuf]) -> Vec<AutostartEntry> {
    let mut entries: BTreeMap<OsString, AutostartEntry> = BTreeMap::new();
    for dir in dirs {
        let Ok(mut listing) = tokio::fs::read_dir(dir).await else {
            continue;
        };
        while let Ok(Some(item)) = listing.next_entry().await {
            let path = item.path();
            if path.extension().is_none_or(|ext| ext != "desktop") {
                continue;
            }
            let Ok(text) = tokio::fs::read_to_string(&path).await else {
                continue;
            };
            if let Some(entry) = parse_desktop_entry(&text, &path) {
                entries.insert(item.file_name(), entry);
            }
        }
    }
    entries.into_values().collect()
}

/// Read `Name`, `Exec` and the disable flags from the `[Desktop Entry]` group.
fn parse_desktop_entry(text: &str, path: &Path) -> Option<AutostartEntry> {
    let mut in_entry = false;
    let mut seen_entry = false;
    let mut name = None;
    let mut exec = None;
    let mut enabled = true;

    for line in text.lines().map(str::trim) {
        if line.starts_with('[') {
            in_entry = line == "[Desktop Entry]";
            seen_entry |= in_entry;
            continue;
        }
        if !in_entry || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "Name" => name = Some(value.to_string()),
            "Exec" => exec = Some(value.to_string()),
            "Hidden" if value.eq_ignore_ascii_case("true") => enabled = false,
            "X-GNOME-Autostart-enabled" if value.eq_ignore_ascii_case("false") => {
                enabled = false;
            }
            _ => {}
        }
    }

    if !seen_entry {
        return None;
    }
    let name = name.or_else(|| {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
    })?;
    Some(AutostartEntry {
        name,
        exec,
        enabled,
        source: path.to_path_buf(),
    })
}

/// First column of `systemctl list-unit-files --no-legend` output.
fn parse_enabled_units(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter(|unit| unit.ends_with(".service"))
        .map(str::to_string)
        .collect()
}
