//! Server parameter models.
//!
//! `ManagedSetting` is the closed set of parameters this tool is allowed to
//! write with `ALTER SYSTEM`. Parameter names are interpolated into SQL
//! verbatim, so they must only ever come from this enum.

use std::collections::BTreeMap;

use serde::Serialize;

/// A server parameter that archiving depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagedSetting {
    /// Shell command used to archive a completed WAL segment.
    ArchiveCommand,
    /// Whether completed WAL segments are handed to `archive_command`.
    ArchiveMode,
    /// How much information is written to the WAL.
    WalLevel,
}

impl ManagedSetting {
    /// Name of the parameter as the server knows it.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ArchiveCommand => "archive_command",
            Self::ArchiveMode => "archive_mode",
            Self::WalLevel => "wal_level",
        }
    }
}

impl std::fmt::Display for ManagedSetting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Target values for the managed parameters.
///
/// Built once at startup and only ever borrowed afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredConfiguration {
    values: BTreeMap<ManagedSetting, String>,
}

impl DesiredConfiguration {
    /// Create an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the desired value for a parameter, replacing any previous one.
    #[must_use]
    pub fn with(mut self, setting: ManagedSetting, value: impl Into<String>) -> Self {
        self.values.insert(setting, value.into());
        self
    }

    /// Desired value for `setting`, if it is part of this configuration.
    #[must_use]
    pub fn get(&self, setting: ManagedSetting) -> Option<&str> {
        self.values.get(&setting).map(String::as_str)
    }

    /// Iterate over `(setting, desired value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (ManagedSetting, &str)> {
        self.values.iter().map(|(s, v)| (*s, v.as_str()))
    }
}

/// Current and desired value of one parameter, observed during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterState {
    pub setting: ManagedSetting,
    pub current: String,
    pub desired: String,
}

impl ParameterState {
    /// Whether the live value already matches. Plain string equality.
    #[must_use]
    pub fn is_compliant(&self) -> bool {
        self.current == self.desired
    }
}
