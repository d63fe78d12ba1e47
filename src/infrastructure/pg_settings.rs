//! PostgreSQL server parameter access.
//!
//! Reads live values from `pg_settings` and writes them with `ALTER SYSTEM`.

use std::time::Duration;

use sqlx::{Connection, PgConnection};

use crate::domain::{AppError, ManagedSetting, Result};

const SELECT_SETTING: &str = "SELECT setting FROM pg_settings WHERE name = $1";
const RELOAD_CONF: &str = "SELECT pg_reload_conf()";

/// Read/write access to server parameters.
pub trait SettingStore {
    /// Current live value of the parameter `name`.
    async fn get(&mut self, name: &str) -> Result<String>;

    /// Persist `value` for `setting` in the server configuration.
    async fn set(&mut self, setting: ManagedSetting, value: &str) -> Result<()>;

    /// Ask the server to re-read its configuration files.
    async fn reload(&mut self) -> Result<()>;

    /// Release the underlying connection. Failures are only logged.
    async fn close(self)
    where
        Self: Sized;
}

/// `SettingStore` backed by a single exclusive connection.
pub struct PgSettingStore {
    conn: PgConnection,
    settle: Duration,
}

impl PgSettingStore {
    /// Connect to the server at `url`.
    ///
    /// # Errors
    /// Returns `Connection` if the server cannot be reached or rejects us.
    pub async fn connect(url: &str, settle: Duration) -> Result<Self> {
        let conn = PgConnection::connect(url)
            .await
            .map_err(AppError::connection)?;

        tracing::debug!("Connected to database");

        Ok(Self { conn, settle })
    }
}

impl SettingStore for PgSettingStore {
    async fn get(&mut self, name: &str) -> Result<String> {
        let value = sqlx::query_scalar::<_, String>(SELECT_SETTING)
            .bind(name)
            .fetch_optional(&mut self.conn)
            .await
            .map_err(|e| AppError::query(name, e))?;

        value.ok_or_else(|| AppError::SettingNotFound { name: name.into() })
    }

    async fn set(&mut self, setting: ManagedSetting, value: &str) -> Result<()> {
        // No escaping: the name is compiled in and the value is trusted operator input.
        let statement = alter_system_statement(setting, value);

        sqlx::raw_sql(&statement)
            .execute(&mut self.conn)
            .await
            .map_err(|e| AppError::apply(setting.name(), value, e))?;

        tracing::info!(setting = %setting, value, "Set PostgreSQL setting");
        Ok(())
    }

    async fn reload(&mut self) -> Result<()> {
        sqlx::query_scalar::<_, bool>(RELOAD_CONF)
            .fetch_one(&mut self.conn)
            .await
            .map_err(|e| AppError::apply("pg_reload_conf()", "", e))?;

        tracing::debug!(settle_ms = self.settle.as_millis(), "Configuration reload requested");
        tokio::time::sleep(self.settle).await;
        Ok(())
    }

    async fn close(self) {
        if let Err(e) = self.conn.close().await {
            tracing::warn!("Failed to close database connection: {}", e);
        }
    }
}

/// `ALTER SYSTEM` statement for one parameter.
fn alter_system_statement(setting: ManagedSetting, value: &str) -> String {
    format!("ALTER SYSTEM SET {} = '{}';", setting.name(), value)
}
