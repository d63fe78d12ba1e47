//! Domain layer - core types and configuration.
//!
//! This layer contains pure models and error types
//! without any I/O (database, filesystem, processes).

pub mod config;
pub mod error;
pub mod settings;

pub use config::{AppConfig, ConfigOverrides};
pub use error::{AppError, Result};
pub use settings::{DesiredConfiguration, ManagedSetting, ParameterState};
