//! Resolved runtime settings for one invocation.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::path::PathBuf;

use board::engine::{EngineCore, EngineError};
use board::storage::FileStorage;
use tracing::{debug, warn};

use crate::CliError;
use crate::cli::GlobalArgs;

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "KANBAN_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub storage_key: String,
    pub assume_yes: bool,
    pub verbose: u8,
}

impl Config {
    #[must_use]
    pub fn from_args(args: &GlobalArgs) -> Self {
        Self {
            data_dir: args.data_dir.clone(),
            storage_key: args.storage_key.trim().to_owned(),
            assume_yes: args.yes,
            verbose: args.verbose,
        }
    }

    /// Default filter directive when `KANBAN_LOG` is unset.
    #[must_use]
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Open file storage under the data directory and restore the snapshot.
    /// An unparsable snapshot is moved aside and the engine starts empty, so
    /// `import` can still restore a backup.
    pub fn open_engine(&self) -> Result<EngineCore, CliError> {
        let storage = FileStorage::open(&self.data_dir)?;
        let mut engine = EngineCore::new(Box::new(storage)).with_storage_key(&self.storage_key);
        match engine.load() {
            Ok(count) => {
                debug!(dir = %self.data_dir.display(), key = %self.storage_key, boards = count, "engine ready");
            }
            Err(EngineError::Snapshot(e)) => {
                let backup = engine.quarantine_snapshot()?;
                warn!(
                    dir = %self.data_dir.display(),
                    backup = backup.as_deref().unwrap_or("-"),
                    error = %e,
                    "unreadable snapshot set aside; starting empty"
                );
            }
            Err(e) => return Err(e.into()),
        }
        Ok(engine)
    }
}
