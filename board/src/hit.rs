//! Element identification for drag gestures.
//!
//! The render layer stamps task cards and column containers with data
//! attributes. A host reports the element under the pointer by handing
//! those attributes to [`ElementRef::from_dataset`], which decides whether
//! the element is a draggable task, a drop-target column, or neither.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

/// Attribute carried by task cards and column containers.
pub const ATTR_BOARD_ID: &str = "data-board-id";
/// Task marker. Only elements carrying it are draggable.
pub const ATTR_TASK_ID: &str = "data-task-id";
/// Column marker. Only elements carrying it accept drops.
pub const ATTR_COLUMN: &str = "data-column";

/// What a pointer-addressed element represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementRef {
    Task { board_id: String, task_id: String },
    Column { board_id: String, column: String },
    /// Chrome, whitespace, or anything outside a board.
    Other,
}

impl ElementRef {
    #[must_use]
    pub fn task(board_id: &str, task_id: &str) -> Self {
        Self::Task { board_id: board_id.to_owned(), task_id: task_id.to_owned() }
    }

    #[must_use]
    pub fn column(board_id: &str, column: &str) -> Self {
        Self::Column { board_id: board_id.to_owned(), column: column.to_owned() }
    }

    /// Classify an element by its data attributes. The task marker wins
    /// over the column marker; a marker without a board id is `Other`.
    #[must_use]
    pub fn from_dataset<'a>(attrs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut board_id = None;
        let mut task_id = None;
        let mut column = None;
        for (name, value) in attrs {
            match name {
                ATTR_BOARD_ID => board_id = Some(value),
                ATTR_TASK_ID => task_id = Some(value),
                ATTR_COLUMN => column = Some(value),
                _ => {}
            }
        }
        match (board_id, task_id, column) {
            (Some(board_id), Some(task_id), _) => Self::task(board_id, task_id),
            (Some(board_id), None, Some(column)) => Self::column(board_id, column),
            _ => Self::Other,
        }
    }

    /// `(board_id, task_id)` when the element can start a drag.
    #[must_use]
    pub fn drag_source(&self) -> Option<(&str, &str)> {
        match self {
            Self::Task { board_id, task_id } => Some((board_id.as_str(), task_id.as_str())),
            _ => None,
        }
    }

    /// `(board_id, column)` when the element accepts a drop.
    #[must_use]
    pub fn drop_target(&self) -> Option<(&str, &str)> {
        match self {
            Self::Column { board_id, column } => Some((board_id.as_str(), column.as_str())),
            _ => None,
        }
    }
}
