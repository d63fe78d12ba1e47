//! Application configuration.
//!
//! Loaded once from TOML at startup, then adjusted by command-line flags.
//! Nothing reads configuration from global state after that.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::settings::{DesiredConfiguration, ManagedSetting};

/// Database connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL. Needs a superuser role.
    #[serde(default = "default_database_url")]
    pub url: String,

    /// How long to wait after `pg_reload_conf()` before re-reading settings.
    #[serde(default = "default_reload_settle_ms")]
    pub reload_settle_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            reload_settle_ms: default_reload_settle_ms(),
        }
    }
}

fn default_database_url() -> String {
    "postgres://postgres@localhost/postgres".into()
}

const fn default_reload_settle_ms() -> u64 {
    500
}

/// Where backups are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Base directory of the archive layout.
    #[serde(default = "default_archive_dir")]
    pub dir: PathBuf,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            dir: default_archive_dir(),
        }
    }
}

fn default_archive_dir() -> PathBuf {
    PathBuf::from("archive")
}

/// Target values for the managed server parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    #[serde(default = "default_archive_command")]
    pub archive_command: String,

    #[serde(default = "default_archive_mode")]
    pub archive_mode: String,

    #[serde(default = "default_wal_level")]
    pub wal_level: String,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            archive_command: default_archive_command(),
            archive_mode: default_archive_mode(),
            wal_level: default_wal_level(),
        }
    }
}

fn default_archive_command() -> String {
    "/bin/true".into()
}

fn default_archive_mode() -> String {
    "on".into()
}

fn default_wal_level() -> String {
    "hot_standby".into()
}

/// External executables that must be present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_required_tools")]
    pub required: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            required: default_required_tools(),
        }
    }
}

fn default_required_tools() -> Vec<String> {
    vec!["pg_basebackup".into()]
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub archive: ArchiveConfig,

    #[serde(default)]
    pub settings: SettingsConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Values given on the command line that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub archive_dir: Option<PathBuf>,
    pub archive_command: Option<String>,
    pub archive_mode: Option<String>,
    pub wal_level: Option<String>,
}

impl AppConfig {
    /// Default configuration file location.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pg-archive-setup")
            .join("config.toml")
    }

    /// Apply command-line overrides.
    #[must_use]
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(url) = overrides.database_url {
            self.database.url = url;
        }
        if let Some(dir) = overrides.archive_dir {
            self.archive.dir = dir;
        }
        if let Some(cmd) = overrides.archive_command {
            self.settings.archive_command = cmd;
        }
        if let Some(mode) = overrides.archive_mode {
            self.settings.archive_mode = mode;
        }
        if let Some(level) = overrides.wal_level {
            self.settings.wal_level = level;
        }
        self
    }

    /// The parameter values the server should end up with.
    #[must_use]
    pub fn desired_configuration(&self) -> DesiredConfiguration {
        DesiredConfiguration::new()
            .with(ManagedSetting::ArchiveCommand, &self.settings.archive_command)
            .with(ManagedSetting::ArchiveMode, &self.settings.archive_mode)
            .with(ManagedSetting::WalLevel, &self.settings.wal_level)
    }
}
