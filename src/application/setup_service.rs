//! One-shot setup of a server for continuous archiving.
//!
//! Checks tools, bootstraps the archive layout, then reconciles the server
//! configuration over a single connection.

use std::path::PathBuf;
use std::time::Duration;

use crate::domain::{AppConfig, DesiredConfiguration, Result};
use crate::infrastructure::{check_all, ArchiveLayout, PgSettingStore, SettingStore};

use super::reconciler::{reconcile, Reconciliation};

/// How a setup run ended.
#[derive(Debug)]
pub enum SetupReport {
    /// The operator declined to reuse a non-empty archive directory.
    Declined { archive_dir: PathBuf },
    /// Directories exist and reconciliation ran to completion.
    Completed {
        archive_dir: PathBuf,
        server_version: String,
        reconciliation: Reconciliation,
    },
}

/// Service running the `setup` command.
pub struct SetupService {
    config: AppConfig,
}

impl SetupService {
    /// Create a new setup service.
    #[must_use]
    pub const fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Run the setup.
    ///
    /// `confirm` is asked before reusing an archive directory that holds
    /// foreign content. Returning `false` ends the run without error.
    ///
    /// # Errors
    /// Returns the first fatal error. The database connection is closed on
    /// every path once it has been opened.
    pub async fn run<C>(&self, confirm: C) -> Result<SetupReport>
    where
        C: FnOnce(&str) -> Result<bool>,
    {
        let Some(layout) = self.prepare(confirm)? else {
            return Ok(SetupReport::Declined {
                archive_dir: self.config.archive.dir.clone(),
            });
        };

        let settle = Duration::from_millis(self.config.database.reload_settle_ms);
        let store = PgSettingStore::connect(&self.config.database.url, settle).await?;

        self.configure(&layout, store).await
    }

    /// Check tools, ask about foreign content, then create the layout.
    ///
    /// Returns `None` when the operator declined.
    fn prepare<C>(&self, confirm: C) -> Result<Option<ArchiveLayout>>
    where
        C: FnOnce(&str) -> Result<bool>,
    {
        check_all(self.config.tools.required.as_slice())?;

        let layout = ArchiveLayout::new(&self.config.archive.dir);
        if layout.is_populated()? {
            let question = format!(
                "Archive directory {} is not empty. Continue?",
                layout.base().display()
            );
            if !confirm(&question)? {
                tracing::info!(path = %layout.base().display(), "Setup declined");
                return Ok(None);
            }
        }

        layout.ensure()?;
        Ok(Some(layout))
    }

    /// Reconcile over `store` and close it, whatever the result.
    async fn configure<S: SettingStore>(
        &self,
        layout: &ArchiveLayout,
        mut store: S,
    ) -> Result<SetupReport> {
        let desired = self.config.desired_configuration();

        let result = configure_server(&mut store, &desired).await;
        store.close().await;
        let (server_version, reconciliation) = result?;

        Ok(SetupReport::Completed {
            archive_dir: layout.base().to_path_buf(),
            server_version,
            reconciliation,
        })
    }
}

/// Log the server version, then reconcile.
async fn configure_server<S: SettingStore>(
    store: &mut S,
    desired: &DesiredConfiguration,
) -> Result<(String, Reconciliation)> {
    let server_version = store.get("server_version").await?;
    tracing::debug!(version = %server_version, "Connected to PostgreSQL");

    let reconciliation = reconcile(store, desired).await?;
    Ok((server_version, reconciliation))
}
