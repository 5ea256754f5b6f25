//! The engine: one explicit context object that owns the board store, its
//! storage, the drag gesture, the open forms, and the event bus.
//!
//! Hosts construct an [`EngineCore`] once at startup and route every user
//! interaction through it. Each mutation runs the same pipeline: update the
//! store, persist the snapshot, raise the render signal, publish an
//! [`Event`]. Drag handlers return [`Action`]s for visual affordances the
//! host applies itself.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use events::{Event, EventBus, EventLog};
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

use crate::ErrorCode;
use crate::consts::STORAGE_KEY;
use crate::doc::{Board, BoardDraft, BoardStats, BoardStore, Snapshot, StoreError, Task, TaskDraft};
use crate::form::{BoardForm, FormError, FormMode, TaskForm};
use crate::hit::ElementRef;
use crate::input::{DragGesture, DragState};
use crate::storage::{Storage, StorageError};
use crate::transfer::{self, TransferError};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("snapshot is not valid: {0}")]
    Snapshot(#[source] serde_json::Error),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error("no {0} form is open")]
    NoOpenForm(&'static str),
}

impl ErrorCode for EngineError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Store(e) => e.error_code(),
            Self::Storage(e) => e.error_code(),
            Self::Snapshot(_) => "E_SNAPSHOT_PARSE",
            Self::Form(e) => e.error_code(),
            Self::Transfer(e) => e.error_code(),
            Self::NoOpenForm(_) => "E_NO_OPEN_FORM",
        }
    }
}

/// Acknowledgement step for destructive actions.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// Confirms everything; for non-interactive hosts.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _prompt: &str) -> bool {
        true
    }
}

/// Whether a confirmation-guarded action went ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Outcome {
    Applied,
    Declined,
}

/// Side effects for the host to apply after a drag event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Style the dragged card.
    MarkDragging { task_id: String },
    /// Highlight a column as the active drop target.
    HighlightColumn { board_id: String, column: String },
    /// Remove every drag affordance.
    ClearHighlights,
    /// The store changed; re-render everything.
    RenderNeeded,
}

/// Open modal forms. At most one of each kind.
#[derive(Debug, Clone, Default)]
struct Modals {
    board: Option<BoardForm>,
    task: Option<TaskForm>,
}

// =============================================================================
// ENGINE
// =============================================================================

pub struct EngineCore {
    store: BoardStore,
    storage: Box<dyn Storage>,
    storage_key: String,
    bus: EventBus,
    log: Rc<RefCell<EventLog>>,
    drag: DragState,
    modals: Modals,
    render_requested: bool,
}

impl EngineCore {
    /// Create an engine over `storage` with an empty store. Call
    /// [`EngineCore::load`] to restore the persisted snapshot.
    #[must_use]
    pub fn new(storage: Box<dyn Storage>) -> Self {
        let log = Rc::new(RefCell::new(EventLog::new()));
        let mut bus = EventBus::new();
        bus.subscribe(log.clone());
        Self {
            store: BoardStore::new(),
            storage,
            storage_key: STORAGE_KEY.to_owned(),
            bus,
            log,
            drag: DragState::Idle,
            modals: Modals::default(),
            render_requested: false,
        }
    }

    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    // --- Persistence ---

    /// Restore the store from the persisted snapshot and return the board
    /// count. A missing snapshot yields an empty store. A corrupt one leaves
    /// the store as it was.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the snapshot cannot be read and `Snapshot` if it
    /// cannot be parsed.
    pub fn load(&mut self) -> Result<usize, EngineError> {
        let Some(raw) = self.storage.read(&self.storage_key)? else {
            self.store.replace(Vec::new());
            self.render_requested = true;
            return Ok(0);
        };
        let snapshot: Snapshot = serde_json::from_str(&raw).map_err(|e| {
            warn!(key = %self.storage_key, error = %e, "ignoring unreadable snapshot");
            EngineError::Snapshot(e)
        })?;
        let count = snapshot.boards.len();
        self.store.replace(snapshot.boards);
        self.render_requested = true;
        debug!(boards = count, "snapshot loaded");
        Ok(count)
    }

    /// Move an unreadable snapshot aside under `<key>-corrupt` so the next
    /// save cannot overwrite it. Returns the backup key, or `None` when no
    /// snapshot exists.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the snapshot cannot be copied or removed.
    pub fn quarantine_snapshot(&mut self) -> Result<Option<String>, EngineError> {
        let Some(raw) = self.storage.read(&self.storage_key)? else {
            return Ok(None);
        };
        let backup = format!("{}-corrupt", self.storage_key);
        self.storage.write(&backup, &raw)?;
        self.storage.remove(&self.storage_key)?;
        warn!(key = %self.storage_key, backup = %backup, "snapshot moved aside");
        Ok(Some(backup))
    }

    /// Overwrite the persisted snapshot with the full board list.
    ///
    /// # Errors
    ///
    /// Returns `Snapshot` on serialization failure and `Storage` on write failure.
    pub fn save(&mut self) -> Result<(), EngineError> {
        let raw = serde_json::to_string(&self.store.snapshot()).map_err(EngineError::Snapshot)?;
        self.storage.write(&self.storage_key, &raw)?;
        Ok(())
    }

    /// Persist, signal a render, and publish. The event goes out even when
    /// the save fails, since memory has already changed.
    fn commit(&mut self, event: Event) -> Result<(), EngineError> {
        let saved = self.save();
        if let Err(e) = &saved {
            error!(error = %e, code = e.error_code(), "failed to persist snapshot");
        }
        self.render_requested = true;
        self.bus.publish(&event);
        saved
    }

    // --- Queries ---

    #[must_use]
    pub fn store(&self) -> &BoardStore {
        &self.store
    }

    #[must_use]
    pub fn boards(&self) -> &[Board] {
        self.store.boards()
    }

    #[must_use]
    pub fn board(&self, board_id: &str) -> Option<&Board> {
        self.store.board(board_id)
    }

    #[must_use]
    pub fn search(&self, query: &str) -> Vec<(&Board, &Task)> {
        self.store.search(query)
    }

    #[must_use]
    pub fn stats(&self, now: OffsetDateTime) -> BoardStats {
        self.store.stats(now)
    }

    #[must_use]
    pub fn log(&self) -> Ref<'_, EventLog> {
        self.log.borrow()
    }

    pub fn clear_log(&mut self) {
        self.log.borrow_mut().clear();
    }

    /// Register additional subscribers (the log is subscribed already).
    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// Returns `true` once per batch of mutations since the last call.
    pub fn take_render_request(&mut self) -> bool {
        std::mem::take(&mut self.render_requested)
    }

    #[must_use]
    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    // --- Boards ---

    /// # Errors
    ///
    /// Returns `Storage`/`Snapshot` if persisting fails; the board is still created.
    pub fn create_board(&mut self, draft: BoardDraft) -> Result<Board, EngineError> {
        let board = self.store.create_board(draft, OffsetDateTime::now_utc());
        info!(board_id = %board.id, name = %board.name, "board created");
        self.commit(Event::BoardCreated { board_id: board.id.clone(), name: board.name.clone() })?;
        Ok(board)
    }

    /// # Errors
    ///
    /// Returns `Store` if the board is missing, or a persistence error.
    pub fn update_board(&mut self, board_id: &str, draft: BoardDraft) -> Result<Board, EngineError> {
        let board = self.store.update_board(board_id, draft, OffsetDateTime::now_utc())?;
        info!(board_id = %board.id, "board updated");
        self.commit(Event::BoardUpdated { board_id: board.id.clone(), name: board.name.clone() })?;
        Ok(board)
    }

    /// Delete a board and all of its tasks once `confirm` agrees.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the board is missing, or a persistence error.
    pub fn delete_board(&mut self, board_id: &str, confirm: &mut dyn Confirm) -> Result<Outcome, EngineError> {
        let board = self
            .store
            .board(board_id)
            .ok_or_else(|| StoreError::BoardNotFound(board_id.to_owned()))?;
        let prompt = format!(
            "Delete board \"{}\" and its {} task(s)? This cannot be undone.",
            board.name,
            board.tasks.len()
        );
        if !confirm.confirm(&prompt) {
            debug!(board_id, "board delete declined");
            return Ok(Outcome::Declined);
        }
        let removed = self.store.delete_board(board_id)?;
        if self.drag.gesture().is_some_and(|g| g.board_id == removed.id) {
            self.drag = DragState::Idle;
        }
        info!(board_id, tasks = removed.tasks.len(), "board deleted");
        self.commit(Event::BoardDeleted {
            board_id: removed.id,
            name: removed.name,
            task_count: removed.tasks.len(),
        })?;
        Ok(Outcome::Applied)
    }

    // --- Tasks ---

    /// # Errors
    ///
    /// Returns `Store` for a missing board or unknown column, or a persistence error.
    pub fn create_task(&mut self, board_id: &str, column: &str, draft: TaskDraft) -> Result<Task, EngineError> {
        let task = self.store.create_task(board_id, column, draft, OffsetDateTime::now_utc())?;
        info!(board_id, task_id = %task.id, column, "task created");
        self.commit(Event::TaskCreated {
            board_id: board_id.to_owned(),
            task_id: task.id.clone(),
            title: task.title.clone(),
            column: task.column.clone(),
        })?;
        Ok(task)
    }

    /// # Errors
    ///
    /// Returns `Store` for a missing board/task or unknown column, or a persistence error.
    pub fn update_task(&mut self, board_id: &str, task_id: &str, draft: TaskDraft) -> Result<Task, EngineError> {
        let task = self.store.update_task(board_id, task_id, draft, OffsetDateTime::now_utc())?;
        info!(board_id, task_id, "task updated");
        self.commit(Event::TaskUpdated {
            board_id: board_id.to_owned(),
            task_id: task.id.clone(),
            title: task.title.clone(),
        })?;
        Ok(task)
    }

    /// # Errors
    ///
    /// Returns `Store` for a missing board/task, or a persistence error.
    pub fn delete_task(&mut self, board_id: &str, task_id: &str, confirm: &mut dyn Confirm) -> Result<Outcome, EngineError> {
        let task = self
            .store
            .board(board_id)
            .ok_or_else(|| StoreError::BoardNotFound(board_id.to_owned()))?
            .task(task_id)
            .ok_or_else(|| StoreError::TaskNotFound {
                board_id: board_id.to_owned(),
                task_id: task_id.to_owned(),
            })?;
        if !confirm.confirm(&format!("Delete task \"{}\"?", task.title)) {
            debug!(board_id, task_id, "task delete declined");
            return Ok(Outcome::Declined);
        }
        let removed = self.store.delete_task(board_id, task_id, OffsetDateTime::now_utc())?;
        if self.drag.dragged_task() == Some(task_id) {
            self.drag = DragState::Idle;
        }
        info!(board_id, task_id, "task deleted");
        self.commit(Event::TaskDeleted {
            board_id: board_id.to_owned(),
            task_id: removed.id,
            title: removed.title,
        })?;
        Ok(Outcome::Applied)
    }

    /// Reassign a task's column within its board.
    ///
    /// # Errors
    ///
    /// Returns `Store` for a missing board/task or unknown column, or a persistence error.
    pub fn move_task(&mut self, board_id: &str, task_id: &str, column: &str) -> Result<Task, EngineError> {
        let (task, from) = self.store.move_task(board_id, task_id, column, OffsetDateTime::now_utc())?;
        info!(board_id, task_id, from = %from, to = column, "task moved");
        self.commit(Event::TaskMoved {
            board_id: board_id.to_owned(),
            task_id: task.id.clone(),
            title: task.title.clone(),
            from,
            to: task.column.clone(),
        })?;
        Ok(task)
    }

    // --- Bulk ---

    /// Remove every board once `confirm` agrees.
    ///
    /// # Errors
    ///
    /// Returns a persistence error.
    pub fn clear_all(&mut self, confirm: &mut dyn Confirm) -> Result<Outcome, EngineError> {
        let prompt = format!("Delete all {} board(s) and their tasks? This cannot be undone.", self.store.len());
        if !confirm.confirm(&prompt) {
            return Ok(Outcome::Declined);
        }
        let board_count = self.store.clear();
        self.drag = DragState::Idle;
        warn!(boards = board_count, "all boards cleared");
        self.commit(Event::DataCleared { board_count })?;
        Ok(Outcome::Applied)
    }

    /// The export document and its suggested file name.
    ///
    /// # Errors
    ///
    /// Returns `Transfer` if serialization fails.
    pub fn export(&self, now: OffsetDateTime) -> Result<(String, String), EngineError> {
        let contents = transfer::export_json(self.store.boards(), now)?;
        Ok((transfer::export_filename(now), contents))
    }

    /// Replace every board with the contents of an import file. A rejected
    /// file leaves the store untouched.
    ///
    /// # Errors
    ///
    /// Returns `Transfer` for a rejected file, or a persistence error.
    pub fn import(&mut self, contents: &str) -> Result<usize, EngineError> {
        let boards = transfer::parse_import(contents)
            .inspect_err(|e| warn!(error = %e, code = e.error_code(), "import rejected"))?;
        let board_count = boards.len();
        self.store.replace(boards);
        self.drag = DragState::Idle;
        info!(boards = board_count, "boards imported");
        self.commit(Event::DataImported { board_count })?;
        Ok(board_count)
    }

    // --- Drag and drop ---

    /// Begin a gesture on a draggable element. Anything else is ignored.
    pub fn on_drag_start(&mut self, element: &ElementRef) -> Vec<Action> {
        let Some((board_id, task_id)) = element.drag_source() else {
            return Vec::new();
        };
        let Some(task) = self.store.board(board_id).and_then(|b| b.task(task_id)) else {
            debug!(board_id, task_id, "drag start on unknown task");
            return Vec::new();
        };
        self.drag = DragState::Dragging(DragGesture {
            board_id: board_id.to_owned(),
            task_id: task_id.to_owned(),
            source_column: task.column.clone(),
            over_column: None,
        });
        debug!(board_id, task_id, "drag started");
        vec![Action::MarkDragging { task_id: task_id.to_owned() }]
    }

    /// Track the hovered drop target. Visual only; never mutates the store.
    pub fn on_drag_over(&mut self, element: &ElementRef) -> Vec<Action> {
        let DragState::Dragging(gesture) = &mut self.drag else {
            return Vec::new();
        };
        match element.drop_target() {
            Some((board_id, column)) if board_id == gesture.board_id => {
                if gesture.over_column.as_deref() == Some(column) {
                    return Vec::new();
                }
                gesture.over_column = Some(column.to_owned());
                vec![
                    Action::ClearHighlights,
                    Action::HighlightColumn { board_id: board_id.to_owned(), column: column.to_owned() },
                ]
            }
            _ => {
                if gesture.over_column.take().is_some() {
                    vec![Action::ClearHighlights]
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// Finish the gesture. Dropping on any column of the same board moves the
    /// task there, the source column included; any other target discards the
    /// gesture.
    ///
    /// # Errors
    ///
    /// Returns a store or persistence error from the move.
    pub fn on_drop(&mut self, element: &ElementRef) -> Result<Vec<Action>, EngineError> {
        let Some(gesture) = self.drag.take() else {
            return Ok(Vec::new());
        };
        let mut actions = vec![Action::ClearHighlights];
        match element.drop_target() {
            Some((board_id, column)) if board_id == gesture.board_id => {
                self.move_task(&gesture.board_id, &gesture.task_id, column)?;
                actions.push(Action::RenderNeeded);
            }
            _ => debug!(task_id = %gesture.task_id, "drop outside a column; gesture discarded"),
        }
        Ok(actions)
    }

    /// Abandon the gesture without a drop. Never mutates the store.
    pub fn on_drag_end(&mut self) -> Vec<Action> {
        match self.drag.take() {
            Some(gesture) => {
                debug!(task_id = %gesture.task_id, "drag ended without drop");
                vec![Action::ClearHighlights]
            }
            None => Vec::new(),
        }
    }

    // --- Forms ---

    /// Open the board form, for editing when `board_id` is given.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the board to edit is missing.
    pub fn open_board_form(&mut self, board_id: Option<&str>) -> Result<&mut BoardForm, EngineError> {
        let form = match board_id {
            None => BoardForm::create(),
            Some(id) => {
                let board = self.store.board(id).ok_or_else(|| StoreError::BoardNotFound(id.to_owned()))?;
                BoardForm::edit(board)
            }
        };
        Ok(self.modals.board.insert(form))
    }

    pub fn board_form_mut(&mut self) -> Option<&mut BoardForm> {
        self.modals.board.as_mut()
    }

    /// Validate and apply the open board form, then close it. On any error
    /// the form stays open with its input intact.
    ///
    /// # Errors
    ///
    /// Returns `NoOpenForm`, `Form` for a blank name, or the store/persistence error.
    pub fn submit_board_form(&mut self) -> Result<Board, EngineError> {
        let form = self.modals.board.as_ref().ok_or(EngineError::NoOpenForm("board"))?;
        let draft = form.validate()?;
        let board = match form.mode.clone() {
            FormMode::Create => self.create_board(draft)?,
            FormMode::Edit(id) => self.update_board(&id, draft)?,
        };
        self.modals.board = None;
        Ok(board)
    }

    pub fn cancel_board_form(&mut self) {
        self.modals.board = None;
    }

    /// Open the task form to create a task in `column`.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the board is missing.
    pub fn open_task_form(&mut self, board_id: &str, column: &str) -> Result<&mut TaskForm, EngineError> {
        if self.store.board(board_id).is_none() {
            return Err(StoreError::BoardNotFound(board_id.to_owned()).into());
        }
        Ok(self.modals.task.insert(TaskForm::create(board_id, column)))
    }

    /// Open the task form pre-populated from an existing task.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the board or task is missing.
    pub fn open_task_edit_form(&mut self, board_id: &str, task_id: &str) -> Result<&mut TaskForm, EngineError> {
        let task = self
            .store
            .board(board_id)
            .ok_or_else(|| StoreError::BoardNotFound(board_id.to_owned()))?
            .task(task_id)
            .ok_or_else(|| StoreError::TaskNotFound {
                board_id: board_id.to_owned(),
                task_id: task_id.to_owned(),
            })?;
        let form = TaskForm::edit(board_id, task);
        Ok(self.modals.task.insert(form))
    }

    pub fn task_form_mut(&mut self) -> Option<&mut TaskForm> {
        self.modals.task.as_mut()
    }

    /// Validate and apply the open task form, then close it. On any error
    /// the form stays open with its input intact.
    ///
    /// # Errors
    ///
    /// Returns `NoOpenForm`, `Form` for a blank title, or the store/persistence error.
    pub fn submit_task_form(&mut self) -> Result<Task, EngineError> {
        let form = self.modals.task.as_ref().ok_or(EngineError::NoOpenForm("task"))?;
        let draft = form.validate()?;
        let board_id = form.board_id.clone();
        let task = match form.mode.clone() {
            FormMode::Create => {
                let column = form.column.trim().to_owned();
                self.create_task(&board_id, &column, draft)?
            }
            FormMode::Edit(task_id) => self.update_task(&board_id, &task_id, draft)?,
        };
        self.modals.task = None;
        Ok(task)
    }

    pub fn cancel_task_form(&mut self) {
        self.modals.task = None;
    }
}
