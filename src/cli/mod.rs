//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

pub mod prompt;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::application::OutputFormat;
use crate::domain::ConfigOverrides;

pub use prompt::Confirm;

/// pg-archive-setup - Prepare PostgreSQL and directories for continuous archiving.
#[derive(Parser, Debug)]
#[command(name = "pg-archive-setup")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format: table or json.
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,

    /// Configuration file (defaults to the user config directory).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Superuser connection URL.
    #[arg(long, env = "PG_ARCHIVE_DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Desired parameter values given on the command line.
#[derive(clap::Args, Debug, Default)]
pub struct SettingArgs {
    /// The command to archive WAL files.
    #[arg(long)]
    pub archive_command: Option<String>,

    /// The archive mode (should be on to archive).
    #[arg(long)]
    pub archive_mode: Option<String>,

    /// The level of information to include in WAL files.
    #[arg(long)]
    pub wal_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Configure PostgreSQL via ALTER SYSTEM and create missing directories.
    ///
    /// Needs a superuser connection and the path where backups should go.
    Setup {
        /// Base directory for backups and WAL.
        #[arg(short, long)]
        archive_dir: Option<PathBuf>,

        #[command(flatten)]
        settings: SettingArgs,

        /// Do not ask before reusing a non-empty archive directory.
        #[arg(short, long)]
        yes: bool,
    },

    /// Show current and desired values of the managed settings.
    Settings {
        #[command(flatten)]
        settings: SettingArgs,
    },

    /// Check that required external tools are on PATH.
    CheckTools,

    /// Take a base backup into the archive directory with pg_basebackup.
    Basebackup {
        /// Base directory for backups and WAL.
        #[arg(short, long)]
        archive_dir: Option<PathBuf>,
    },

    /// Write a default configuration file if none exists.
    InitConfig,
}

impl Cli {
    /// Parse the output format argument.
    pub fn output_format(&self) -> Result<OutputFormat, String> {
        self.format.parse()
    }

    /// Command-line values that override the configuration file.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides {
            database_url: self.database_url.clone(),
            ..Default::default()
        };

        let (archive_dir, settings) = match &self.command {
            Commands::Setup {
                archive_dir,
                settings,
                ..
            } => (archive_dir.clone(), Some(settings)),
            Commands::Settings { settings } => (None, Some(settings)),
            Commands::Basebackup { archive_dir } => (archive_dir.clone(), None),
            Commands::CheckTools | Commands::InitConfig => (None, None),
        };

        overrides.archive_dir = archive_dir;
        if let Some(settings) = settings {
            overrides.archive_command = settings.archive_command.clone();
            overrides.archive_mode = settings.archive_mode.clone();
            overrides.wal_level = settings.wal_level.clone();
        }

        overrides
    }
}
