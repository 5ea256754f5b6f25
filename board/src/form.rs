//! Board and task forms: free-text fields in, validated drafts out.
//!
//! Each form is either creating a new entity or editing an existing one,
//! decided by the [`FormMode`] attached when it was opened. Validation only
//! checks required fields; priority and due date are taken verbatim. List
//! fields are comma-separated.

#[cfg(test)]
#[path = "form_test.rs"]
mod form_test;

use crate::ErrorCode;
use crate::consts::{DEFAULT_BOARD_COLOR, DEFAULT_COLUMNS};
use crate::doc::{Board, BoardDraft, Priority, Task, TaskDraft};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("{0} is required")]
    Required(&'static str),
}

impl ErrorCode for FormError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Required(_) => "E_FIELD_REQUIRED",
        }
    }
}

/// Pending-edit context of an open form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    /// Editing the entity with this id.
    Edit(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardForm {
    pub mode: FormMode,
    pub name: String,
    pub color: String,
    /// Comma-separated column names.
    pub columns: String,
}

impl BoardForm {
    #[must_use]
    pub fn create() -> Self {
        Self {
            mode: FormMode::Create,
            name: String::new(),
            color: DEFAULT_BOARD_COLOR.to_owned(),
            columns: DEFAULT_COLUMNS.join(", "),
        }
    }

    /// Pre-populated from the board's current values.
    #[must_use]
    pub fn edit(board: &Board) -> Self {
        Self {
            mode: FormMode::Edit(board.id.clone()),
            name: board.name.clone(),
            color: board.color.clone(),
            columns: board.columns.join(", "),
        }
    }

    /// # Errors
    ///
    /// Returns `Required("name")` when the name is blank.
    pub fn validate(&self) -> Result<BoardDraft, FormError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(FormError::Required("name"));
        }
        Ok(BoardDraft {
            name: name.to_owned(),
            color: non_empty(&self.color),
            columns: parse_list(&self.columns),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskForm {
    pub mode: FormMode,
    pub board_id: String,
    pub column: String,
    pub title: String,
    pub description: String,
    pub priority: String,
    pub due_date: String,
    /// Comma-separated labels.
    pub labels: String,
    pub assignee: String,
}

impl TaskForm {
    #[must_use]
    pub fn create(board_id: &str, column: &str) -> Self {
        Self {
            mode: FormMode::Create,
            board_id: board_id.to_owned(),
            column: column.to_owned(),
            title: String::new(),
            description: String::new(),
            priority: Priority::default().as_str().to_owned(),
            due_date: String::new(),
            labels: String::new(),
            assignee: String::new(),
        }
    }

    /// Pre-populated from the task's current values.
    #[must_use]
    pub fn edit(board_id: &str, task: &Task) -> Self {
        Self {
            mode: FormMode::Edit(task.id.clone()),
            board_id: board_id.to_owned(),
            column: task.column.clone(),
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            priority: task.priority.as_str().to_owned(),
            due_date: task.due_date.clone().unwrap_or_default(),
            labels: task.labels.join(", "),
            assignee: task.assignee.clone().unwrap_or_default(),
        }
    }

    /// # Errors
    ///
    /// Returns `Required("title")` when the title is blank.
    pub fn validate(&self) -> Result<TaskDraft, FormError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(FormError::Required("title"));
        }
        Ok(TaskDraft {
            title: title.to_owned(),
            description: non_empty(&self.description),
            priority: Priority::parse_lenient(&self.priority),
            due_date: non_empty(&self.due_date),
            labels: parse_list(&self.labels),
            assignee: non_empty(&self.assignee),
            column: non_empty(&self.column),
        })
    }
}

/// Split on commas, trim, and drop empty entries.
#[must_use]
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}
