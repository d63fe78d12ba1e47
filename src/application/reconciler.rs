//! Configuration reconciliation.
//!
//! Brings the managed server parameters to their desired values using at
//! most two passes. A pass reads every parameter first and only then writes
//! the ones that differ, so a failed read never leaves a partial write behind.
//!
//! When the first pass changed anything, the server is asked to reload and a
//! second pass re-checks everything. Parameters that still differ after that
//! are taken to need a full restart. A third pass is never attempted.

use crate::domain::{DesiredConfiguration, ParameterState, Result};
use crate::infrastructure::SettingStore;

/// What a single pass observed and changed.
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    /// Live values as read at the start of the pass.
    pub states: Vec<ParameterState>,
    /// Number of parameters written during the pass.
    pub changed: usize,
}

impl PassReport {
    /// Parameters that did not match when the pass started.
    pub fn pending(&self) -> impl Iterator<Item = &ParameterState> {
        self.states.iter().filter(|s| !s.is_compliant())
    }
}

/// Final state of a reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing had to be written.
    AlreadyCompliant,
    /// Changes were written and all of them are live.
    Settled { changed: usize },
    /// These parameters still differ and need a server restart.
    RestartRequired { pending: Vec<ParameterState> },
}

/// Both passes of a reconciliation run.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub first: PassReport,
    pub second: Option<PassReport>,
}

impl Reconciliation {
    /// Number of passes that were executed.
    #[must_use]
    pub fn passes(&self) -> usize {
        1 + usize::from(self.second.is_some())
    }

    #[must_use]
    pub fn outcome(&self) -> Outcome {
        match &self.second {
            None => Outcome::AlreadyCompliant,
            Some(second) if second.changed == 0 => Outcome::Settled {
                changed: self.first.changed,
            },
            Some(second) => Outcome::RestartRequired {
                pending: second.pending().cloned().collect(),
            },
        }
    }
}

/// Read the live value of every desired parameter without writing anything.
///
/// # Errors
/// Returns the first read error.
pub async fn inspect<S: SettingStore>(
    store: &mut S,
    desired: &DesiredConfiguration,
) -> Result<Vec<ParameterState>> {
    let mut states = Vec::new();

    for (setting, value) in desired.iter() {
        let current = store.get(setting.name()).await?;
        tracing::debug!(%setting, current = %current, desired = value, "Read setting");

        states.push(ParameterState {
            setting,
            current,
            desired: value.to_string(),
        });
    }

    Ok(states)
}

/// One read-compare-write cycle over every desired parameter.
///
/// # Errors
/// Returns the first read or write error. Nothing is rolled back.
pub async fn run_pass<S: SettingStore>(
    store: &mut S,
    desired: &DesiredConfiguration,
) -> Result<PassReport> {
    let states = inspect(store, desired).await?;
    let mut changed = 0;

    for state in states.iter().filter(|s| !s.is_compliant()) {
        tracing::info!(
            setting = %state.setting,
            current = %state.current,
            desired = %state.desired,
            "Setting differs"
        );
        store.set(state.setting, &state.desired).await?;
        changed += 1;
    }

    Ok(PassReport { states, changed })
}

/// Drive the server toward `desired`.
///
/// # Errors
/// Returns the first read, write or reload error.
pub async fn reconcile<S: SettingStore>(
    store: &mut S,
    desired: &DesiredConfiguration,
) -> Result<Reconciliation> {
    let first = run_pass(store, desired).await?;
    if first.changed == 0 {
        tracing::info!("All settings already as desired");
        return Ok(Reconciliation {
            first,
            second: None,
        });
    }

    store.reload().await?;

    let second = run_pass(store, desired).await?;
    tracing::info!(
        first_pass = first.changed,
        second_pass = second.changed,
        "Reconciliation finished"
    );

    Ok(Reconciliation {
        first,
        second: Some(second),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    use crate::domain::{AppError, ManagedSetting};

    /// In-memory server. `ALTER SYSTEM` values become live on reload,
    /// except for restart-gated parameters which never do.
    #[derive(Default)]
    struct FakeServer {
        live: HashMap<String, String>,
        staged: HashMap<String, String>,
        restart_gated: HashSet<String>,
        fail_read: Option<String>,
        fail_write: Option<String>,
        reads: usize,
        writes: Vec<(ManagedSetting, String)>,
        reloads: usize,
    }

    impl FakeServer {
        fn with_live(values: &[(&str, &str)]) -> Self {
            Self {
                live: values
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect(),
                ..Default::default()
            }
        }
    }

    impl SettingStore for FakeServer {
        async fn get(&mut self, name: &str) -> Result<String> {
            self.reads += 1;
            if self.fail_read.as_deref() == Some(name) {
                return Err(AppError::Query {
                    name: name.into(),
                    message: "connection reset".into(),
                    source: None,
                });
            }
            self.live
                .get(name)
                .cloned()
                .ok_or_else(|| AppError::SettingNotFound { name: name.into() })
        }

        async fn set(&mut self, setting: ManagedSetting, value: &str) -> Result<()> {
            if self.fail_write.as_deref() == Some(setting.name()) {
                return Err(AppError::Apply {
                    name: setting.name().into(),
                    value: value.into(),
                    message: "permission denied".into(),
                    source: None,
                });
            }
            self.writes.push((setting, value.to_string()));
            self.staged.insert(setting.name().to_string(), value.to_string());
            Ok(())
        }

        async fn reload(&mut self) -> Result<()> {
            self.reloads += 1;
            for (name, value) in &self.staged {
                if !self.restart_gated.contains(name) {
                    self.live.insert(name.clone(), value.clone());
                }
            }
            Ok(())
        }

        async fn close(self) {}
    }

    fn desired() -> DesiredConfiguration {
        DesiredConfiguration::new()
            .with(ManagedSetting::ArchiveCommand, "/bin/true")
            .with(ManagedSetting::ArchiveMode, "on")
            .with(ManagedSetting::WalLevel, "hot_standby")
    }

    fn compliant_server() -> FakeServer {
        FakeServer::with_live(&[
            ("archive_command", "/bin/true"),
            ("archive_mode", "on"),
            ("wal_level", "hot_standby"),
        ])
    }

    #[tokio::test]
    async fn test_compliant_server_is_left_alone() {
        let mut server = compliant_server();

        let result = reconcile(&mut server, &desired()).await.unwrap();

        assert_eq!(result.outcome(), Outcome::AlreadyCompliant);
        assert_eq!(result.passes(), 1);
        assert_eq!(result.first.changed, 0);
        assert!(server.writes.is_empty());
        assert_eq!(server.reloads, 0);
    }

    #[tokio::test]
    async fn test_reload_only_change_settles_on_second_pass() {
        let mut server = compliant_server();
        server.live.insert("archive_command".into(), "(disabled)".into());

        let result = reconcile(&mut server, &desired()).await.unwrap();

        assert_eq!(result.first.changed, 1);
        assert_eq!(result.second.as_ref().unwrap().changed, 0);
        assert_eq!(result.outcome(), Outcome::Settled { changed: 1 });
        assert_eq!(
            server.writes,
            [(ManagedSetting::ArchiveCommand, "/bin/true".to_string())]
        );
        assert_eq!(server.reloads, 1);
    }

    #[tokio::test]
    async fn test_restart_gated_change_stops_after_two_passes() {
        let mut server = compliant_server();
        server.live.insert("wal_level".into(), "replica".into());
        server.restart_gated.insert("wal_level".into());

        let result = reconcile(&mut server, &desired()).await.unwrap();

        assert_eq!(result.passes(), 2);
        assert_eq!(result.first.changed, 1);
        assert_eq!(result.second.as_ref().unwrap().changed, 1);
        assert_eq!(server.writes.len(), 2);
        assert_eq!(server.reads, 6);

        match result.outcome() {
            Outcome::RestartRequired { pending } => {
                assert_eq!(pending.len(), 1);
                assert_eq!(pending[0].setting, ManagedSetting::WalLevel);
                assert_eq!(pending[0].current, "replica");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_mixed_changes_report_only_restart_gated() {
        let mut server = FakeServer::with_live(&[
            ("archive_command", ""),
            ("archive_mode", "off"),
            ("wal_level", "minimal"),
        ]);
        server.restart_gated.insert("archive_mode".into());
        server.restart_gated.insert("wal_level".into());

        let result = reconcile(&mut server, &desired()).await.unwrap();

        assert_eq!(result.first.changed, 3);
        match result.outcome() {
            Outcome::RestartRequired { pending } => {
                let names: Vec<_> = pending.iter().map(|s| s.setting).collect();
                assert_eq!(names, [ManagedSetting::ArchiveMode, ManagedSetting::WalLevel]);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_read_error_aborts_before_any_write() {
        let mut server = FakeServer::with_live(&[
            ("archive_command", "wrong"),
            ("archive_mode", "off"),
            ("wal_level", "minimal"),
        ]);
        server.fail_read = Some("wal_level".into());

        let err = reconcile(&mut server, &desired()).await.unwrap_err();

        assert!(matches!(err, AppError::Query { ref name, .. } if name == "wal_level"));
        assert!(server.writes.is_empty());
        assert_eq!(server.reloads, 0);
    }

    #[tokio::test]
    async fn test_unknown_setting_is_fatal() {
        let mut server = FakeServer::with_live(&[("archive_mode", "on")]);

        let err = reconcile(&mut server, &desired()).await.unwrap_err();

        assert!(matches!(err, AppError::SettingNotFound { .. }));
        assert!(server.writes.is_empty());
    }

    #[tokio::test]
    async fn test_write_error_aborts_run() {
        let mut server = FakeServer::with_live(&[
            ("archive_command", "wrong"),
            ("archive_mode", "off"),
            ("wal_level", "hot_standby"),
        ]);
        server.fail_write = Some("archive_mode".into());

        let err = reconcile(&mut server, &desired()).await.unwrap_err();

        assert!(matches!(err, AppError::Apply { ref name, .. } if name == "archive_mode"));
        assert_eq!(server.reloads, 0);
    }

    #[tokio::test]
    async fn test_inspect_never_writes() {
        let mut server = FakeServer::with_live(&[
            ("archive_command", "wrong"),
            ("archive_mode", "off"),
            ("wal_level", "minimal"),
        ]);

        let states = inspect(&mut server, &desired()).await.unwrap();

        assert_eq!(states.len(), 3);
        assert!(states.iter().all(|s| !s.is_compliant()));
        assert!(server.writes.is_empty());
    }

    #[tokio::test]
    async fn test_desired_configuration_is_not_mutated() {
        let desired = desired();
        let before = desired.clone();
        let mut server = FakeServer::with_live(&[
            ("archive_command", "x"),
            ("archive_mode", "x"),
            ("wal_level", "x"),
        ]);

        reconcile(&mut server, &desired).await.unwrap();

        assert_eq!(desired, before);
    }
}
