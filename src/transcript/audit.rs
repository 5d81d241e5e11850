use super::Turn;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Append-only JSONL file holding one serialized [`Turn`] per line.
#[derive(Debug)]
pub struct AuditSink {
    path: PathBuf,
    file: tokio::fs::File,
}

impl AuditSink {
    /// Open (or create) `<dir>/<session_id>.jsonl` for appending.
    pub async fn open(dir: &Path, session_id: &str) -> Result<Self> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create audit directory {}", dir.display()))?;
        let path = dir.join(format!("{session_id}.jsonl"));
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open audit file {}", path.display()))?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn write(&mut self, turn: &Turn) -> Result<()> {
        let mut line = serde_json::to_string(turn).context("Failed to serialize turn")?;
        line.push('\n');
        self.file
            .write_all(line.as_bytes())
            .await
            .context("Failed to append turn")?;
        self.file.flush().await.context("Failed to flush audit file")?;
        Ok(())
    }
}

/// Read a persisted transcript back. Blank lines are skipped; a malformed
/// line is an error naming its line number.
pub async fn load_jsonl(path: &Path) -> Result<Vec<Turn>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read transcript {}", path.display()))?;
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("{}:{}: invalid turn", path.display(), idx + 1))
        })
        .collect()
}
