//! Configuration file management.
//!
//! Handles loading and creating the TOML configuration file.

use std::fs;
use std::path::Path;

use crate::domain::{AppConfig, AppError, Result};

/// Default configuration file content.
pub const DEFAULT_CONFIG: &str = r#"# pg-archive-setup configuration
# Auto-generated - edit as needed

[database]
# Superuser connection used for ALTER SYSTEM
url = "postgres://postgres@localhost/postgres"

# Milliseconds to wait after pg_reload_conf() before re-reading settings
reload_settle_ms = 500

[archive]
# Base directory; current/, base/ and wal/ are created below it
dir = "archive"

[settings]
# The command to archive WAL files
archive_command = "/bin/true"

# The archive mode (should be on to archive)
archive_mode = "on"

# The level of information to include in WAL files
wal_level = "hot_standby"

[tools]
# Executables that must be on PATH before anything runs
required = ["pg_basebackup"]
"#;

/// Load configuration from `path`, or the default location when `None`.
///
/// A missing file yields the built-in defaults.
///
/// # Errors
/// Returns error if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config_path = path.map_or_else(AppConfig::default_config_path, Path::to_path_buf);

    if config_path.exists() {
        load_config_from_file(&config_path)
    } else {
        tracing::debug!(path = %config_path.display(), "No config file, using defaults");
        Ok(AppConfig::default())
    }
}

/// Load configuration from a specific file.
///
/// # Errors
/// Returns error if file cannot be read or parsed.
pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    let config = toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("Failed to parse config file {}: {e}", path.display()),
    })?;

    tracing::debug!(path = %path.display(), "Loaded configuration");

    Ok(config)
}

/// Write the default configuration file if it doesn't exist.
///
/// Returns `true` when a file was created.
///
/// # Errors
/// Returns error if file cannot be created.
pub fn ensure_config_exists(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::io("Failed to create config directory", e))?;
    }

    fs::write(path, DEFAULT_CONFIG)
        .map_err(|e| AppError::io("Failed to create default config", e))?;

    tracing::info!(path = %path.display(), "Created default configuration");

    Ok(true)
}
