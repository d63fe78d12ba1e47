//! Infrastructure layer - external adapters (database, filesystem, processes).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod archive_dirs;
pub mod config;
pub mod output_watcher;
pub mod pg_basebackup;
pub mod pg_settings;
pub mod tools;

pub use archive_dirs::ArchiveLayout;
pub use config::{ensure_config_exists, load_config};
pub use pg_basebackup::{run_basebackup, PG_BASEBACKUP};
pub use pg_settings::{PgSettingStore, SettingStore};
pub use tools::{check_all, ResolvedTool};
