//! Document model: boards, tasks, and the in-memory board store.
//!
//! This module defines what a board holds (`Board`, `Task`, `Priority`),
//! sparse input types for create/edit (`BoardDraft`, `TaskDraft`), the
//! persisted `Snapshot` shape, and the runtime store that owns every live
//! board (`BoardStore`).
//!
//! The store only mutates memory. Persistence, the render signal, and event
//! publication are layered on top by [`crate::engine::EngineCore`].

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::ErrorCode;
use crate::consts::{DEFAULT_BOARD_COLOR, DEFAULT_COLUMNS, DONE_COLUMN, ID_SUFFIX_LEN};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("board not found: {0}")]
    BoardNotFound(String),
    #[error("task not found: {task_id} on board {board_id}")]
    TaskNotFound { board_id: String, task_id: String },
    #[error("board {board_id} has no column \"{column}\"")]
    UnknownColumn { board_id: String, column: String },
}

impl ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::BoardNotFound(_) => "E_BOARD_NOT_FOUND",
            Self::TaskNotFound { .. } => "E_TASK_NOT_FOUND",
            Self::UnknownColumn { .. } => "E_UNKNOWN_COLUMN",
        }
    }
}

/// Task urgency. Ordered from least to most urgent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Parse a free-text priority. Unrecognized input falls back to `Medium`.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            "critical" => Self::Critical,
            _ => Self::Medium,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work positioned in exactly one column of its board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    /// Kept verbatim as entered; parsed only when checking for overdue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    pub column: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Task {
    /// A task is overdue when its due date has passed and it is not done.
    /// Unparseable due dates are never overdue.
    #[must_use]
    pub fn is_overdue(&self, now: OffsetDateTime) -> bool {
        if self.column == DONE_COLUMN {
            return false;
        }
        self.due_date
            .as_deref()
            .and_then(parse_due_date)
            .is_some_and(|due| due < now)
    }

    fn matches(&self, needle: &str) -> bool {
        let hit = |s: &str| s.to_lowercase().contains(needle);
        hit(&self.title)
            || self.description.as_deref().is_some_and(hit)
            || self.assignee.as_deref().is_some_and(hit)
            || self.labels.iter().any(|l| hit(l))
    }
}

/// A named set of ordered columns and the tasks distributed across them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: String,
    pub name: String,
    pub color: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Board {
    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    #[must_use]
    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    /// Tasks whose `column` matches, in insertion order.
    pub fn tasks_in<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Task> + 'a {
        self.tasks.iter().filter(move |t| t.column == column)
    }

    /// Derived count; never stored.
    #[must_use]
    pub fn column_count(&self, column: &str) -> usize {
        self.tasks_in(column).count()
    }

    fn task_mut(&mut self, task_id: &str) -> Result<&mut Task, StoreError> {
        let board_id = self.id.clone();
        self.tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| StoreError::TaskNotFound { board_id, task_id: task_id.to_owned() })
    }

    fn require_column(&self, column: &str) -> Result<(), StoreError> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(StoreError::UnknownColumn { board_id: self.id.clone(), column: column.to_owned() })
        }
    }
}

/// Input for creating or editing a board.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardDraft {
    pub name: String,
    /// `None` keeps the current color (or the default on create).
    pub color: Option<String>,
    /// Empty keeps the current columns (or the defaults on create).
    pub columns: Vec<String>,
}

/// Input for creating or editing a task. Edits replace every field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub due_date: Option<String>,
    pub labels: Vec<String>,
    pub assignee: Option<String>,
    /// Ignored on create, where the column is explicit. `None` keeps it on edit.
    pub column: Option<String>,
}

/// Persisted shape of the whole store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub boards: Vec<Board>,
}

/// Aggregate counts across every board.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BoardStats {
    pub boards: usize,
    pub tasks: usize,
    pub done: usize,
    pub overdue: usize,
    pub by_priority: BTreeMap<Priority, usize>,
}

// =============================================================================
// STORE
// =============================================================================

/// In-memory list of boards, in creation order.
#[derive(Debug, Clone, Default)]
pub struct BoardStore {
    boards: Vec<Board>,
}

impl BoardStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn boards(&self) -> &[Board] {
        &self.boards
    }

    #[must_use]
    pub fn board(&self, board_id: &str) -> Option<&Board> {
        self.boards.iter().find(|b| b.id == board_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.boards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot { boards: self.boards.clone() }
    }

    /// Replace every board, as on load or import.
    pub fn replace(&mut self, boards: Vec<Board>) {
        self.boards = boards;
    }

    /// Remove every board, returning how many were removed.
    pub fn clear(&mut self) -> usize {
        let count = self.boards.len();
        self.boards.clear();
        count
    }

    fn board_mut(&mut self, board_id: &str) -> Result<&mut Board, StoreError> {
        self.boards
            .iter_mut()
            .find(|b| b.id == board_id)
            .ok_or_else(|| StoreError::BoardNotFound(board_id.to_owned()))
    }

    // --- Boards ---

    pub fn create_board(&mut self, draft: BoardDraft, now: OffsetDateTime) -> Board {
        let mut columns = normalize_columns(draft.columns);
        if columns.is_empty() {
            columns = DEFAULT_COLUMNS.iter().map(|c| (*c).to_owned()).collect();
        }
        let board = Board {
            id: generate_id(now),
            name: draft.name.trim().to_owned(),
            color: draft.color.unwrap_or_else(|| DEFAULT_BOARD_COLOR.to_owned()),
            columns,
            tasks: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.boards.push(board.clone());
        board
    }

    /// Tasks referencing a column removed by this edit keep their stale
    /// `column` value.
    ///
    /// # Errors
    ///
    /// Returns `BoardNotFound` if no board has `board_id`.
    pub fn update_board(&mut self, board_id: &str, draft: BoardDraft, now: OffsetDateTime) -> Result<Board, StoreError> {
        let board = self.board_mut(board_id)?;
        board.name = draft.name.trim().to_owned();
        if let Some(color) = draft.color {
            board.color = color;
        }
        let columns = normalize_columns(draft.columns);
        if !columns.is_empty() {
            board.columns = columns;
        }
        board.updated_at = now;
        Ok(board.clone())
    }

    /// Remove a board together with all of its tasks.
    ///
    /// # Errors
    ///
    /// Returns `BoardNotFound` if no board has `board_id`.
    pub fn delete_board(&mut self, board_id: &str) -> Result<Board, StoreError> {
        let index = self
            .boards
            .iter()
            .position(|b| b.id == board_id)
            .ok_or_else(|| StoreError::BoardNotFound(board_id.to_owned()))?;
        Ok(self.boards.remove(index))
    }

    // --- Tasks ---

    /// # Errors
    ///
    /// Returns `BoardNotFound` or `UnknownColumn`.
    pub fn create_task(&mut self, board_id: &str, column: &str, draft: TaskDraft, now: OffsetDateTime) -> Result<Task, StoreError> {
        let board = self.board_mut(board_id)?;
        board.require_column(column)?;
        let task = Task {
            id: generate_id(now),
            title: draft.title.trim().to_owned(),
            description: draft.description,
            priority: draft.priority,
            due_date: draft.due_date,
            labels: draft.labels,
            assignee: draft.assignee,
            column: column.to_owned(),
            created_at: now,
            updated_at: now,
        };
        board.tasks.push(task.clone());
        board.updated_at = now;
        Ok(task)
    }

    /// # Errors
    ///
    /// Returns `BoardNotFound`, `TaskNotFound`, or `UnknownColumn` when the
    /// draft moves the task to a column the board lacks. Keeping a stale
    /// column is allowed.
    pub fn update_task(&mut self, board_id: &str, task_id: &str, draft: TaskDraft, now: OffsetDateTime) -> Result<Task, StoreError> {
        let board = self.board_mut(board_id)?;
        let current = board.task_mut(task_id)?.column.clone();
        if let Some(column) = draft.column.as_deref().filter(|c| *c != current) {
            board.require_column(column)?;
        }
        let task = board.task_mut(task_id)?;
        task.title = draft.title.trim().to_owned();
        task.description = draft.description;
        task.priority = draft.priority;
        task.due_date = draft.due_date;
        task.labels = draft.labels;
        task.assignee = draft.assignee;
        if let Some(column) = draft.column {
            task.column = column;
        }
        task.updated_at = now;
        let updated = task.clone();
        board.updated_at = now;
        Ok(updated)
    }

    /// # Errors
    ///
    /// Returns `BoardNotFound` or `TaskNotFound`.
    pub fn delete_task(&mut self, board_id: &str, task_id: &str, now: OffsetDateTime) -> Result<Task, StoreError> {
        let board = self.board_mut(board_id)?;
        let index = board
            .tasks
            .iter()
            .position(|t| t.id == task_id)
            .ok_or_else(|| StoreError::TaskNotFound {
                board_id: board_id.to_owned(),
                task_id: task_id.to_owned(),
            })?;
        board.updated_at = now;
        Ok(board.tasks.remove(index))
    }

    /// Reassign a task's column within its board. Returns the updated task
    /// and the column it left.
    ///
    /// # Errors
    ///
    /// Returns `BoardNotFound`, `TaskNotFound`, or `UnknownColumn`.
    pub fn move_task(&mut self, board_id: &str, task_id: &str, column: &str, now: OffsetDateTime) -> Result<(Task, String), StoreError> {
        let board = self.board_mut(board_id)?;
        board.require_column(column)?;
        let task = board.task_mut(task_id)?;
        let from = std::mem::replace(&mut task.column, column.to_owned());
        task.updated_at = now;
        let moved = task.clone();
        board.updated_at = now;
        Ok((moved, from))
    }

    // --- Queries ---

    /// Case-insensitive match against title, description, labels, and assignee.
    /// A blank query matches nothing.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<(&Board, &Task)> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.boards
            .iter()
            .flat_map(|b| b.tasks.iter().map(move |t| (b, t)))
            .filter(|(_, t)| t.matches(&needle))
            .collect()
    }

    #[must_use]
    pub fn stats(&self, now: OffsetDateTime) -> BoardStats {
        let mut stats = BoardStats {
            boards: self.boards.len(),
            by_priority: Priority::ALL.iter().map(|p| (*p, 0)).collect(),
            ..BoardStats::default()
        };
        for task in self.boards.iter().flat_map(|b| b.tasks.iter()) {
            stats.tasks += 1;
            if task.column == DONE_COLUMN {
                stats.done += 1;
            }
            if task.is_overdue(now) {
                stats.overdue += 1;
            }
            *stats.by_priority.entry(task.priority).or_insert(0) += 1;
        }
        stats
    }
}

/// Whether `task` matches a render-time search filter.
#[must_use]
pub fn task_matches(task: &Task, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    needle.is_empty() || task.matches(&needle)
}

// =============================================================================
// HELPERS
// =============================================================================

/// Trim, drop empties, and de-duplicate column names (first occurrence wins).
#[must_use]
pub fn normalize_columns(columns: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(columns.len());
    for column in columns {
        let column = column.trim();
        if !column.is_empty() && !out.iter().any(|c| c == column) {
            out.push(column.to_owned());
        }
    }
    out
}

/// Millisecond timestamp in base 36 followed by a random lowercase suffix.
/// No collision check is performed.
#[must_use]
pub fn generate_id(now: OffsetDateTime) -> String {
    let millis = u64::try_from(now.unix_timestamp_nanos() / 1_000_000).unwrap_or(0);
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ID_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{}{suffix}", to_base36(millis))
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_owned();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[usize::try_from(n % 36).unwrap_or(0)]);
        n /= 36;
    }
    buf.iter().rev().map(|b| char::from(*b)).collect()
}

/// Accepts a full RFC 3339 timestamp or a plain `YYYY-MM-DD` date, which is
/// taken as midnight UTC.
#[must_use]
pub fn parse_due_date(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(ts);
    }
    let format = format_description!("[year]-[month]-[day]");
    match Date::parse(raw, &format) {
        Ok(date) => Some(date.midnight().assume_utc()),
        Err(_) => None,
    }
}
