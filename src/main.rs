mod cli;
mod commands;
mod config;
mod confirm;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use board::ErrorCode;
use board::engine::EngineError;
use board::storage::StorageError;
use clap::Parser;
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::{Config, LOG_ENV};
use crate::confirm::Prompt;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode output: {0}")]
    Json(#[from] serde_json::Error),
}

impl ErrorCode for CliError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Engine(e) => e.error_code(),
            Self::Storage(e) => e.error_code(),
            Self::Io { .. } => "E_IO",
            Self::Json(_) => "E_JSON",
        }
    }
}

fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();
    let config = Config::from_args(&cli.global);
    init_tracing(&config);

    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "ignoring unreadable .env"),
    }

    match run(&config, cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.error_code(), error = %e, "command failed");
            eprintln!("error [{}]: {e}", e.error_code());
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(config.log_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(config: &Config, cli: Cli) -> Result<(), CliError> {
    let mut engine = config.open_engine()?;
    let mut prompt = Prompt::new(config.assume_yes);
    let output = commands::run(&mut engine, cli.command, &mut prompt, OffsetDateTime::now_utc())?;
    print!("{output}");
    let log = commands::format_log(&engine.log());
    if !log.is_empty() {
        print!("{log}");
    }
    Ok(())
}
