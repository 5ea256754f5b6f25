//! Export and import of the full board list as a JSON file.
//!
//! Export writes `{ "boards": [...], "exportedAt": "<ISO-8601>" }`. Import
//! accepts any JSON object with a `boards` array of valid boards with
//! unique ids and replaces the store wholesale; anything else is rejected before the store
//! is touched.

#[cfg(test)]
#[path = "transfer_test.rs"]
mod transfer_test;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::macros::format_description;

use crate::ErrorCode;
use crate::doc::Board;

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("Invalid file format: not valid JSON ({0})")]
    Malformed(#[source] serde_json::Error),
    #[error("Invalid file format: missing boards array")]
    MissingBoards,
    #[error("Invalid file format: boards are malformed ({0})")]
    InvalidBoards(#[source] serde_json::Error),
    #[error("Invalid file format: duplicate id {0:?}")]
    DuplicateId(String),
    #[error("failed to serialize export: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl ErrorCode for TransferError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "E_IMPORT_MALFORMED",
            Self::MissingBoards => "E_IMPORT_MISSING_BOARDS",
            Self::InvalidBoards(_) => "E_IMPORT_INVALID_BOARDS",
            Self::DuplicateId(_) => "E_IMPORT_DUPLICATE_ID",
            Self::Serialize(_) => "E_EXPORT_SERIALIZE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFile {
    pub boards: Vec<Board>,
    #[serde(with = "time::serde::rfc3339")]
    pub exported_at: OffsetDateTime,
}

/// Pretty-printed export document.
///
/// # Errors
///
/// Returns `Serialize` if serialization fails.
pub fn export_json(boards: &[Board], now: OffsetDateTime) -> Result<String, TransferError> {
    let file = ExportFile { boards: boards.to_vec(), exported_at: now };
    serde_json::to_string_pretty(&file).map_err(TransferError::Serialize)
}

/// `kanban-export-YYYY-MM-DD.json`, dated by `now`.
#[must_use]
pub fn export_filename(now: OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day]");
    let date = now.date().format(&format).unwrap_or_else(|_| now.date().to_string());
    format!("kanban-export-{date}.json")
}

/// Parse an import document down to its boards.
///
/// # Errors
///
/// Returns `Malformed` for invalid JSON, `MissingBoards` when there is no
/// `boards` array, `InvalidBoards` when an entry is not a valid board, and
/// `DuplicateId` when two boards, or two tasks of one board, share an id.
pub fn parse_import(contents: &str) -> Result<Vec<Board>, TransferError> {
    let mut value: Value = serde_json::from_str(contents).map_err(TransferError::Malformed)?;
    let boards = match value.get_mut("boards") {
        Some(boards) if boards.is_array() => boards.take(),
        _ => return Err(TransferError::MissingBoards),
    };
    let boards: Vec<Board> = serde_json::from_value(boards).map_err(TransferError::InvalidBoards)?;
    check_unique_ids(&boards)?;
    Ok(boards)
}

fn check_unique_ids(boards: &[Board]) -> Result<(), TransferError> {
    let mut board_ids = HashSet::new();
    for board in boards {
        if !board_ids.insert(board.id.as_str()) {
            return Err(TransferError::DuplicateId(board.id.clone()));
        }
        let mut task_ids = HashSet::new();
        if let Some(task) = board.tasks.iter().find(|t| !task_ids.insert(t.id.as_str())) {
            return Err(TransferError::DuplicateId(task.id.clone()));
        }
    }
    Ok(())
}
