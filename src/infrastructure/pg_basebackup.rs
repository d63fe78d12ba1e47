//! `pg_basebackup` invocation.
//!
//! Runs a tar-format base backup into the archive layout and forwards the
//! tool's output to the log while it runs.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use chrono::Utc;
use tokio::process::Command;

use crate::domain::{AppError, Result};

use super::archive_dirs::ArchiveLayout;
use super::output_watcher::OutputWatcher;

/// Executable name.
pub const PG_BASEBACKUP: &str = "pg_basebackup";

/// Result of a finished base backup.
#[derive(Debug)]
pub struct BaseBackupResult {
    /// Directory the backup was written to.
    pub target: PathBuf,
    /// Lines of output the tool produced.
    pub output_lines: usize,
}

/// Target directory for a backup started now.
#[must_use]
pub fn backup_target(layout: &ArchiveLayout) -> PathBuf {
    layout
        .base_backups_dir()
        .join(Utc::now().format("%Y%m%dT%H%M%SZ").to_string())
}

fn basebackup_args(target: &Path, database_url: &str) -> Vec<String> {
    vec![
        "--pgdata".into(),
        target.display().to_string(),
        "--dbname".into(),
        database_url.into(),
        "--format=tar".into(),
        "--gzip".into(),
        "--wal-method=fetch".into(),
        "--progress".into(),
        "--verbose".into(),
    ]
}

/// Run `pg_basebackup` and wait for it and its output to finish.
///
/// # Errors
/// Returns error if the process cannot be started or exits unsuccessfully.
pub async fn run_basebackup(layout: &ArchiveLayout, database_url: &str) -> Result<BaseBackupResult> {
    let target = backup_target(layout);

    tracing::info!(dir = %target.display(), "Starting base backup");

    let mut child = Command::new(PG_BASEBACKUP)
        .args(basebackup_args(&target, database_url))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| AppError::io(format!("Failed to start {PG_BASEBACKUP}"), e))?;

    let stdout = child.stdout.take().ok_or_else(|| AppError::Config {
        message: format!("{PG_BASEBACKUP} stdout was not captured"),
    })?;
    let stderr = child.stderr.take().ok_or_else(|| AppError::Config {
        message: format!("{PG_BASEBACKUP} stderr was not captured"),
    })?;

    let stdout_watcher = OutputWatcher::spawn(stdout, |line| tracing::info!("{}", line));
    // pg_basebackup reports progress and --verbose notes on stderr.
    let stderr_watcher = OutputWatcher::spawn(stderr, |line| tracing::info!("{}", line));

    let status = child
        .wait()
        .await
        .map_err(|e| AppError::io(format!("Failed to wait for {PG_BASEBACKUP}"), e))?;

    let out = stdout_watcher.wait().await;
    let err = stderr_watcher.wait().await;
    for error in [&out.error, &err.error].into_iter().flatten() {
        tracing::warn!("Lost {} output: {}", PG_BASEBACKUP, error);
    }

    if !status.success() {
        return Err(AppError::ToolFailed {
            tool: PG_BASEBACKUP.into(),
            status: status.to_string(),
        });
    }

    tracing::info!(dir = %target.display(), "Base backup finished");

    Ok(BaseBackupResult {
        target,
        output_lines: out.lines + err.lines,
    })
}
