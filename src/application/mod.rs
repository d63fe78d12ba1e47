//! Application layer - use cases and orchestration.
//!
//! This layer contains the reconciliation logic and the setup
//! routine that ties directories, tools and the server together.

pub mod formatter;
pub mod reconciler;
pub mod setup_service;

pub use formatter::{
    format_outcome, format_parameters_json, format_parameters_table, format_tools_table,
    OutputFormat,
};
pub use reconciler::{inspect, Outcome};
pub use setup_service::{SetupReport, SetupService};
