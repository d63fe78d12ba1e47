//! Output formatting for parameter states and tool listings.
//!
//! Supports a table view for people and JSON for scripts.

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};

use crate::domain::ParameterState;
use crate::infrastructure::ResolvedTool;

use super::reconciler::Outcome;

/// Output format options.
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    /// Human-readable table.
    #[default]
    Table,
    /// JSON format for programmatic use.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {s}. Use: table, json")),
        }
    }
}

/// Formats parameter states as a table.
pub fn format_parameters_table(states: &[ParameterState]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Setting", "Current", "Desired", "Status"]);

    for state in states {
        let status = if state.is_compliant() { "ok" } else { "differs" };
        table.add_row(vec![
            state.setting.name(),
            state.current.as_str(),
            state.desired.as_str(),
            status,
        ]);
    }

    table.to_string()
}

/// Formats parameter states as JSON.
///
/// # Errors
/// Returns error if serialization fails.
pub fn format_parameters_json(states: &[ParameterState]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(states)
}

/// Formats resolved tools as a table.
pub fn format_tools_table(tools: &[ResolvedTool]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Tool", "Path"]);

    for tool in tools {
        table.add_row(vec![tool.name.clone(), tool.path.display().to_string()]);
    }

    table.to_string()
}

/// One-paragraph summary of a reconciliation outcome.
pub fn format_outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::AlreadyCompliant => {
            format!("{} PostgreSQL is already configured for archiving", "✓".green().bold())
        }
        Outcome::Settled { changed } => format!(
            "{} Changed {} setting(s), all active now",
            "✓".green().bold(),
            changed.to_string().cyan()
        ),
        Outcome::RestartRequired { pending } => {
            let names: Vec<&str> = pending.iter().map(|s| s.setting.name()).collect();
            format!(
                "{} Not all settings took effect, restart the database! Pending: {}",
                "⚠".yellow().bold(),
                names.join(", ").yellow()
            )
        }
    }
}
