//! `foyer` command-line entry point.
//!
//! # Responsibility
//! - Resolve configuration, logging and the database, then dispatch.
//! - Map failures to a severity-prefixed message and exit code.

mod cli;
mod error;
mod output;
mod run;

use crate::cli::Cli;
use crate::error::{CliError, CliResult};
use crate::run::Context;
use chrono::Local;
use clap::Parser;
use foyer_core::model::now_epoch_ms;
use foyer_core::{init_from_config, load_config, open_db};
use log::{error, info};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(
                "event=cli_command module=cli status=error severity={} error={}",
                err.severity().as_str(),
                error_code(&err)
            );
            eprintln!("{}: {}", err.severity().as_str(), err.user_message());
            ExitCode::from(err.exit_code())
        }
    }
}

fn execute(cli: Cli) -> CliResult<()> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(dir) = config.log_dir.take() {
        let dir = if dir.is_absolute() {
            dir
        } else {
            std::env::current_dir()
                .map_err(|source| CliError::Io {
                    path: dir.clone(),
                    source,
                })?
                .join(dir)
        };
        config.log_dir = Some(dir);
    }
    init_from_config(&config)?;

    let conn = open_db(&config.db_path)?;
    info!("event=cli_command module=cli status=start");
    let ctx = Context {
        today: cli.today.unwrap_or_else(|| Local::now().date_naive()),
        now_ms: now_epoch_ms(),
        format: cli.format,
        config,
    };
    run::run(&conn, &ctx, cli.command)?;
    info!("event=cli_command module=cli status=ok");
    Ok(())
}

fn error_code(err: &CliError) -> &'static str {
    match err {
        CliError::App(err) => err.code(),
        CliError::Config(_) => "config",
        CliError::Logging(_) => "logging",
        CliError::Io { .. } => "io",
    }
}
