//! External tool discovery.

use std::path::PathBuf;

use crate::domain::{AppError, Result};

/// A tool that was found on the search path.
#[derive(Debug, Clone)]
pub struct ResolvedTool {
    pub name: String,
    pub path: PathBuf,
}

/// Resolve every tool in `names` on `PATH`.
///
/// Stops at the first missing tool. Nothing is executed.
///
/// # Errors
/// Returns `ToolUnavailable` naming the first tool that cannot be resolved.
pub fn check_all<S: AsRef<str>>(names: &[S]) -> Result<Vec<ResolvedTool>> {
    names
        .iter()
        .map(|name| -> Result<ResolvedTool> {
            let name = name.as_ref();
            let path = which::which(name).map_err(|e| AppError::ToolUnavailable {
                tool: name.to_string(),
                source: Some(e),
            })?;

            tracing::debug!(tool = name, path = %path.display(), "Found tool");
            Ok(ResolvedTool {
                name: name.to_string(),
                path,
            })
        })
        .collect()
}
