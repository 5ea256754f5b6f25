//! Drag gesture state.
//!
//! `DragState` is the active gesture being tracked between drag-start and
//! drop/drag-end. The platform serializes drags, so there is at most one
//! gesture at a time. Transitions are driven by [`crate::engine::EngineCore`].

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

/// Context recorded at drag-start and carried until the gesture ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragGesture {
    pub board_id: String,
    pub task_id: String,
    /// Column the task was in when the drag began.
    pub source_column: String,
    /// Column currently highlighted as the drop target, if any.
    pub over_column: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragState {
    /// No gesture in progress; waiting for the next drag-start.
    #[default]
    Idle,
    /// A task is being dragged.
    Dragging(DragGesture),
}

impl DragState {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    #[must_use]
    pub fn gesture(&self) -> Option<&DragGesture> {
        match self {
            Self::Idle => None,
            Self::Dragging(gesture) => Some(gesture),
        }
    }

    /// The id of the task being dragged, if any.
    #[must_use]
    pub fn dragged_task(&self) -> Option<&str> {
        self.gesture().map(|g| g.task_id.as_str())
    }

    /// End the gesture, returning it.
    pub fn take(&mut self) -> Option<DragGesture> {
        match std::mem::take(self) {
            Self::Idle => None,
            Self::Dragging(gesture) => Some(gesture),
        }
    }
}
