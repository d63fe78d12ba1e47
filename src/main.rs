//! pg-archive-setup - Prepare a PostgreSQL server for continuous archiving.
//!
//! Reconciles `archive_command`, `archive_mode` and `wal_level` with
//! `ALTER SYSTEM`, tells you when a restart is needed, and creates the
//! archive directory layout.
//!
//!   pg-archive-setup setup -a /srv/archive     # Configure server and directories
//!   pg-archive-setup settings                  # Compare live and desired values
//!   pg-archive-setup check-tools               # Verify pg_basebackup & co. are on PATH
//!   pg-archive-setup basebackup                # Take a base backup into <archive>/base

mod application;
mod cli;
mod domain;
mod infrastructure;

use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{
    format_outcome, format_parameters_json, format_parameters_table, format_tools_table, inspect,
    Outcome, OutputFormat, SetupReport, SetupService,
};
use cli::{Cli, Commands, Confirm};
use domain::AppConfig;
use infrastructure::{ArchiveLayout, PgSettingStore, SettingStore};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main application logic.
async fn run(cli: Cli) -> domain::Result<()> {
    let format = cli
        .output_format()
        .map_err(|e| domain::AppError::Config { message: e })?;

    if matches!(cli.command, Commands::InitConfig) {
        return cmd_init_config(&cli);
    }

    let config = infrastructure::load_config(cli.config.as_deref())?.with_overrides(cli.overrides());

    match cli.command {
        Commands::Setup { yes, .. } => cmd_setup(config, yes).await?,
        Commands::Settings { .. } => cmd_settings(&config, format).await?,
        Commands::CheckTools => cmd_check_tools(&config, format)?,
        Commands::Basebackup { .. } => cmd_basebackup(&config).await?,
        Commands::InitConfig => {}
    }

    Ok(())
}

/// Configure the server and create the archive layout.
async fn cmd_setup(config: AppConfig, assume_yes: bool) -> domain::Result<()> {
    println!("{}", "Configure PostgreSQL for archiving.".bold());

    let service = SetupService::new(config);
    let report = service
        .run(|question| {
            if assume_yes {
                return Ok(true);
            }
            let answer = Confirm::new(question).ask()?;
            tracing::debug!(attempts = answer.attempts, "Confirmation received");
            Ok(answer.confirmed)
        })
        .await?;

    match report {
        SetupReport::Declined { archive_dir } => {
            println!(
                "{} Left {} untouched, nothing configured",
                "✗".yellow().bold(),
                archive_dir.display()
            );
        }
        SetupReport::Completed {
            archive_dir,
            server_version,
            reconciliation,
        } => {
            println!(
                "{} Archive directories ready in {}",
                "✓".green().bold(),
                archive_dir.display()
            );
            println!("  PostgreSQL {server_version}");

            tracing::info!(passes = reconciliation.passes(), "Reconciliation done");
            let outcome = reconciliation.outcome();
            if let Outcome::RestartRequired { pending } = &outcome {
                tracing::warn!(
                    pending = pending.len(),
                    "Not all settings took effect, restart the database!"
                );
            }
            println!("{}", format_outcome(&outcome));
        }
    }

    Ok(())
}

/// Show live versus desired values without changing anything.
async fn cmd_settings(config: &AppConfig, format: OutputFormat) -> domain::Result<()> {
    let desired = config.desired_configuration();
    let settle = Duration::from_millis(config.database.reload_settle_ms);
    let mut store = PgSettingStore::connect(&config.database.url, settle).await?;

    let states = inspect(&mut store, &desired).await;
    store.close().await;
    let states = states?;

    let output = match format {
        OutputFormat::Table => format_parameters_table(&states),
        OutputFormat::Json => {
            format_parameters_json(&states).map_err(domain::AppError::json_parse)?
        }
    };

    println!("{output}");
    Ok(())
}

/// Resolve required tools and list where they live.
fn cmd_check_tools(config: &AppConfig, format: OutputFormat) -> domain::Result<()> {
    let tools = infrastructure::check_all(config.tools.required.as_slice())?;

    match format {
        OutputFormat::Table => println!("{}", format_tools_table(&tools)),
        OutputFormat::Json => {
            let entries: Vec<_> = tools
                .iter()
                .map(|t| serde_json::json!({ "name": t.name, "path": t.path }))
                .collect();
            let json =
                serde_json::to_string_pretty(&entries).map_err(domain::AppError::json_parse)?;
            println!("{json}");
        }
    }

    println!("{} All required tools found", "✓".green().bold());
    Ok(())
}

/// Take a base backup into the archive layout.
async fn cmd_basebackup(config: &AppConfig) -> domain::Result<()> {
    infrastructure::check_all(&[infrastructure::PG_BASEBACKUP])?;

    let layout = ArchiveLayout::new(&config.archive.dir);
    layout.ensure()?;

    let result = infrastructure::run_basebackup(&layout, &config.database.url).await?;

    println!(
        "{} Base backup written to {} ({} lines of output)",
        "✓".green().bold(),
        result.target.display(),
        result.output_lines
    );
    Ok(())
}

/// Write the default configuration file.
fn cmd_init_config(cli: &Cli) -> domain::Result<()> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(AppConfig::default_config_path);

    if infrastructure::ensure_config_exists(&path)? {
        println!("{} Created {}", "✓".green().bold(), path.display());
    } else {
        println!("Config already exists at {}", path.display());
    }
    Ok(())
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
