use super::{HostContext, HostTool, bounded_count};
use crate::tools::schema::{FieldKind, FieldSpec, InputSchema};
use crate::tools::traits::ToolFuture;
use crate::tools::types::{ToolArguments, ToolDescriptor, ToolError, ToolOutput};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

const SECS_PER_DAY: u64 = 86_400;

pub(super) fn tools(ctx: &Arc<HostContext>) -> Vec<HostTool> {
    vec![HostTool::new(
        ToolDescriptor::mutating(
            "disk_cleanup",
            "Delete files older than min_age_days from the configured cleanup \
             directories (temporary files) and report the space freed. Stops \
             early when the command time budget runs out.",
            InputSchema::empty().field(
                FieldSpec::optional("min_age_days", FieldKind::Integer)
                    .describe("Only delete files not modified for this many days (default 7)"),
            ),
        ),
        ctx,
        disk_cleanup,
    )]
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
struct CleanupReport {
    directories: Vec<PathBuf>,
    files_removed: u64,
    bytes_freed: u64,
    errors: Vec<String>,
    /// The time budget ran out before every directory was walked.
    stopped_early: bool,
}

fn disk_cleanup<'a>(ctx: &'a HostContext, arguments: &'a ToolArguments) -> ToolFuture<'a> {
    Box::pin(async move {
        let days = bounded_count(arguments, "min_age_days", 7, 1, 3650)?;
        let dirs = ctx.cleanup_dirs.clone();
        if dirs.is_empty() {
            return Err(ToolError::unavailable("no cleanup directories are configured"));
        }
        let cutoff = SystemTime::now()
            .checked_sub(Duration::from_secs(days * SECS_PER_DAY))
            .unwrap_or(SystemTime::UNIX_EPOCH);

        // The registry never cuts a mutating call off; the walk carries its own deadline.
        let deadline = Instant::now() + ctx.command_timeout;
        let report = tokio::task::spawn_blocking(move || clean_dirs(&dirs, cutoff, deadline))
            .await
            .map_err(|e| ToolError::execution(format!("cleanup task failed: {e}")))?;

        tracing::info!(
            files = report.files_removed,
            bytes = report.bytes_freed,
            errors = report.errors.len(),
            stopped_early = report.stopped_early,
            "disk cleanup finished"
        );
        let value = serde_json::to_value(&report)
            .map_err(|e| ToolError::execution(format!("failed to serialize report: {e}")))?;
        Ok(ToolOutput::json(value))
    })
}

fn clean_dirs(dirs: &[PathBuf], cutoff: SystemTime, deadline: Instant) -> CleanupReport {
    let mut report = CleanupReport::default();
    for dir in dirs {
        if report.stopped_early {
            break;
        }
        if !dir.is_dir() {
            report
                .errors
                .push(format!("{} is not a directory", dir.display()));
            continue;
        }
        report.directories.push(dir.clone());
        clean_dir(dir, cutoff, deadline, &mut report);
    }
    report
}

/// Remove stale regular files below `dir`. Symlinks are never followed or
/// removed; entries that cannot be read are reported and skipped. No file is
/// removed once `deadline` has passed.
fn clean_dir(dir: &Path, cutoff: SystemTime, deadline: Instant, report: &mut CleanupReport) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) => {
            report.errors.push(format!("{}: {error}", dir.display()));
            return;
        }
    };

    for entry in entries.flatten() {
        if report.stopped_early {
            return;
        }
        let path = entry.path();
        let Ok(metadata) = path.symlink_metadata() else {
            continue;
        };
        let file_type = metadata.file_type();
        if file_type.is_dir() {
            clean_dir(&path, cutoff, deadline, report);
        } else if file_type.is_file() {
            let stale = metadata.modified().is_ok_and(|modified| modified < cutoff);
            if !stale {
                continue;
            }
            if Instant::now() >= deadline {
                report.stopped_early = true;
                return;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    report.files_removed += 1;
                    report.bytes_freed += metadata.len();
                }
                Err(error) => report.errors.push(format!("{}: {error}", path.display())),
            }
        }
    }
}
