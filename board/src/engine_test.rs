use std::cell::RefCell;
use std::rc::Rc;

use events::{Event, Subscriber};
use time::macros::datetime;

use super::*;
use crate::doc::Priority;
use crate::storage::MemoryStorage;

// =============================================================
// Helpers
// =============================================================

/// Storage shared with the test so it can inspect or corrupt snapshots.
#[derive(Clone, Default)]
struct SharedStorage(Rc<RefCell<MemoryStorage>>);

impl Storage for SharedStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.0.borrow().read(key)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.0.borrow_mut().write(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.0.borrow_mut().remove(key)
    }
}

/// Storage whose writes always fail.
struct BrokenStorage;

impl Storage for BrokenStorage {
    fn read(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn write(&mut self, key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Io {
            path: key.into(),
            source: std::io::Error::other("disk full"),
        })
    }

    fn remove(&mut self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

struct Decline;

impl Confirm for Decline {
    fn confirm(&mut self, _prompt: &str) -> bool {
        false
    }
}

#[derive(Default)]
struct Prompts(Vec<String>);

impl Confirm for Prompts {
    fn confirm(&mut self, prompt: &str) -> bool {
        self.0.push(prompt.to_owned());
        true
    }
}

#[derive(Default)]
struct Recorder(Vec<Event>);

impl Subscriber for Recorder {
    fn notify(&mut self, event: &Event) {
        self.0.push(event.clone());
    }
}

fn engine() -> (EngineCore, SharedStorage) {
    let storage = SharedStorage::default();
    (EngineCore::new(Box::new(storage.clone())), storage)
}

fn sprint(engine: &mut EngineCore) -> Board {
    let draft = BoardDraft {
        name: "Sprint 1".to_owned(),
        color: None,
        columns: vec!["To Do".to_owned(), "Doing".to_owned(), "Done".to_owned()],
    };
    engine.create_board(draft).unwrap()
}

fn task(title: &str) -> TaskDraft {
    TaskDraft { title: title.to_owned(), ..TaskDraft::default() }
}

fn newest_message(engine: &EngineCore) -> String {
    engine.log().entries().next().map(|e| e.message.clone()).unwrap_or_default()
}

fn persisted(storage: &SharedStorage) -> Snapshot {
    let raw = storage.read(STORAGE_KEY).unwrap().unwrap();
    serde_json::from_str(&raw).unwrap()
}

// =============================================================
// Mutation pipeline
// =============================================================

#[test]
fn create_drag_and_drop_moves_task() {
    let (mut engine, storage) = engine();
    let board = sprint(&mut engine);
    let t = engine.create_task(&board.id, "To Do", task("Write spec")).unwrap();
    assert!(engine.take_render_request());

    let start = engine.on_drag_start(&ElementRef::task(&board.id, &t.id));
    assert_eq!(start, vec![Action::MarkDragging { task_id: t.id.clone() }]);
    assert_eq!(engine.drag_state().dragged_task(), Some(t.id.as_str()));

    let over = engine.on_drag_over(&ElementRef::column(&board.id, "Doing"));
    assert_eq!(
        over,
        vec![
            Action::ClearHighlights,
            Action::HighlightColumn { board_id: board.id.clone(), column: "Doing".to_owned() },
        ]
    );
    assert_eq!(engine.board(&board.id).unwrap().task(&t.id).unwrap().column, "To Do");

    let dropped = engine.on_drop(&ElementRef::column(&board.id, "Doing")).unwrap();
    assert_eq!(dropped, vec![Action::ClearHighlights, Action::RenderNeeded]);
    assert!(engine.drag_state().is_idle());

    let moved = engine.board(&board.id).unwrap().task(&t.id).unwrap();
    assert_eq!(moved.column, "Doing");
    assert_eq!(engine.board(&board.id).unwrap().tasks_in("To Do").count(), 0);
    assert_eq!(newest_message(&engine), "Task \"Write spec\" moved from To Do to Doing");
    assert!(engine.take_render_request());
    assert!(!engine.take_render_request());

    let saved = persisted(&storage);
    assert_eq!(saved.boards[0].task(&t.id).unwrap().column, "Doing");
}

#[test]
fn every_mutation_persists_and_logs() {
    let (mut engine, storage) = engine();
    let board = sprint(&mut engine);
    assert_eq!(persisted(&storage).boards.len(), 1);
    assert_eq!(newest_message(&engine), "Board \"Sprint 1\" created");

    let draft = BoardDraft { name: "Sprint 2".to_owned(), color: Some("#00ff00".to_owned()), columns: Vec::new() };
    let updated = engine.update_board(&board.id, draft).unwrap();
    assert_eq!(updated.columns, board.columns);
    assert_eq!(persisted(&storage).boards[0].color, "#00ff00");

    let t = engine.create_task(&board.id, "To Do", task("a")).unwrap();
    let edit = TaskDraft { priority: Priority::High, ..task("b") };
    engine.update_task(&board.id, &t.id, edit).unwrap();
    assert_eq!(persisted(&storage).boards[0].tasks[0].priority, Priority::High);
    assert_eq!(newest_message(&engine), "Task \"b\" updated");
    assert_eq!(engine.log().len(), 4);
}

#[test]
fn subscribers_receive_events_after_persistence() {
    let (mut engine, storage) = engine();
    let recorder = Rc::new(RefCell::new(Recorder::default()));
    engine.bus_mut().subscribe(recorder.clone());

    let board = sprint(&mut engine);
    let recorded = recorder.borrow();
    assert_eq!(recorded.0.len(), 1);
    assert_eq!(recorded.0[0].board_id(), Some(board.id.as_str()));
    assert!(storage.read(STORAGE_KEY).unwrap().is_some());
}

#[test]
fn failed_save_still_publishes_and_reports() {
    let mut engine = EngineCore::new(Box::new(BrokenStorage));
    let err = engine.create_board(BoardDraft { name: "x".to_owned(), ..BoardDraft::default() }).unwrap_err();
    assert_eq!(err.error_code(), "E_STORAGE_IO");
    assert_eq!(engine.boards().len(), 1);
    assert_eq!(engine.log().len(), 1);
}

#[test]
fn failed_mutation_publishes_nothing() {
    let (mut engine, _) = engine();
    let board = sprint(&mut engine);
    engine.take_render_request();
    let before = engine.log().len();

    let err = engine.create_task(&board.id, "Nope", task("x")).unwrap_err();
    assert_eq!(err.error_code(), "E_UNKNOWN_COLUMN");
    assert!(matches!(engine.move_task("missing", "t", "Doing"), Err(EngineError::Store(StoreError::BoardNotFound(_)))));
    assert_eq!(engine.log().len(), before);
    assert!(!engine.take_render_request());
}

#[test]
fn log_keeps_twenty_newest() {
    let (mut engine, _) = engine();
    let board = sprint(&mut engine);
    for i in 0..25 {
        engine.create_task(&board.id, "To Do", task(&format!("t{i}"))).unwrap();
    }
    assert_eq!(engine.log().len(), 20);
    assert_eq!(newest_message(&engine), "Task \"t24\" created in To Do");
    let oldest = engine.log().entries().last().map(|e| e.message.clone()).unwrap();
    assert_eq!(oldest, "Task \"t5\" created in To Do");

    engine.clear_log();
    assert!(engine.log().is_empty());
    assert_eq!(engine.boards()[0].tasks.len(), 25);
}

// =============================================================
// Confirmation
// =============================================================

#[test]
fn declined_board_delete_keeps_board_and_tasks() {
    let (mut engine, storage) = engine();
    let board = sprint(&mut engine);
    engine.create_task(&board.id, "To Do", task("a")).unwrap();
    engine.create_task(&board.id, "Doing", task("b")).unwrap();
    let before = engine.log().len();

    let outcome = engine.delete_board(&board.id, &mut Decline).unwrap();
    assert_eq!(outcome, Outcome::Declined);
    assert_eq!(engine.board(&board.id).unwrap().tasks.len(), 2);
    assert_eq!(persisted(&storage).boards[0].tasks.len(), 2);
    assert_eq!(engine.log().len(), before);
}

#[test]
fn confirmed_board_delete_cascades() {
    let (mut engine, storage) = engine();
    let board = sprint(&mut engine);
    engine.create_task(&board.id, "To Do", task("a")).unwrap();
    engine.create_task(&board.id, "Doing", task("b")).unwrap();

    let mut prompts = Prompts::default();
    let outcome = engine.delete_board(&board.id, &mut prompts).unwrap();
    assert_eq!(outcome, Outcome::Applied);
    assert!(prompts.0[0].contains("\"Sprint 1\" and its 2 task(s)"));
    assert!(engine.boards().is_empty());
    assert!(engine.search("a").is_empty());
    assert!(persisted(&storage).boards.is_empty());
    assert_eq!(newest_message(&engine), "Board \"Sprint 1\" deleted with 2 task(s)");
}

#[test]
fn task_delete_requires_confirmation() {
    let (mut engine, _) = engine();
    let board = sprint(&mut engine);
    let t = engine.create_task(&board.id, "To Do", task("a")).unwrap();

    assert_eq!(engine.delete_task(&board.id, &t.id, &mut Decline).unwrap(), Outcome::Declined);
    assert!(engine.board(&board.id).unwrap().task(&t.id).is_some());

    assert_eq!(engine.delete_task(&board.id, &t.id, &mut AssumeYes).unwrap(), Outcome::Applied);
    assert!(engine.board(&board.id).unwrap().tasks.is_empty());
    assert!(matches!(
        engine.delete_task(&board.id, &t.id, &mut AssumeYes),
        Err(EngineError::Store(StoreError::TaskNotFound { .. }))
    ));
}

#[test]
fn clear_all_is_guarded() {
    let (mut engine, storage) = engine();
    sprint(&mut engine);
    sprint(&mut engine);

    assert_eq!(engine.clear_all(&mut Decline).unwrap(), Outcome::Declined);
    assert_eq!(engine.boards().len(), 2);

    assert_eq!(engine.clear_all(&mut AssumeYes).unwrap(), Outcome::Applied);
    assert!(engine.boards().is_empty());
    assert!(persisted(&storage).boards.is_empty());
    assert_eq!(newest_message(&engine), "Cleared 2 board(s)");
}

// =============================================================
// Drag and drop
// =============================================================

#[test]
fn drop_outside_column_is_a_no_op() {
    let (mut engine, _) = engine();
    let board = sprint(&mut engine);
    let t = engine.create_task(&board.id, "To Do", task("a")).unwrap();
    engine.take_render_request();
    let before = engine.log().len();

    engine.on_drag_start(&ElementRef::task(&board.id, &t.id));
    engine.on_drag_over(&ElementRef::column(&board.id, "Doing"));
    assert_eq!(engine.on_drag_over(&ElementRef::Other), vec![Action::ClearHighlights]);
    let actions = engine.on_drop(&ElementRef::Other).unwrap();
    assert_eq!(actions, vec![Action::ClearHighlights]);

    assert_eq!(engine.board(&board.id).unwrap().task(&t.id).unwrap().column, "To Do");
    assert_eq!(engine.log().len(), before);
    assert!(!engine.take_render_request());
    assert!(engine.drag_state().is_idle());
}

#[test]
fn drop_on_source_column_persists_and_logs_move() {
    let (mut engine, storage) = engine();
    let board = sprint(&mut engine);
    let t = engine.create_task(&board.id, "To Do", task("a")).unwrap();
    storage.0.borrow_mut().remove(STORAGE_KEY).unwrap();
    engine.take_render_request();
    let before = engine.log().len();

    engine.on_drag_start(&ElementRef::task(&board.id, &t.id));
    let actions = engine.on_drop(&ElementRef::column(&board.id, "To Do")).unwrap();

    assert_eq!(actions, vec![Action::ClearHighlights, Action::RenderNeeded]);
    assert_eq!(engine.log().len(), before + 1);
    assert_eq!(newest_message(&engine), "Task \"a\" moved from To Do to To Do");
    assert_eq!(persisted(&storage).boards[0].tasks[0].column, "To Do");
    assert!(engine.take_render_request());
    assert!(engine.drag_state().is_idle());
}

#[test]
fn drop_on_other_board_changes_nothing() {
    let (mut engine, _) = engine();
    let board = sprint(&mut engine);
    let other = sprint(&mut engine);
    let t = engine.create_task(&board.id, "To Do", task("a")).unwrap();
    let before = engine.log().len();

    engine.on_drag_start(&ElementRef::task(&board.id, &t.id));
    assert!(engine.on_drag_over(&ElementRef::column(&other.id, "Doing")).is_empty());
    assert_eq!(engine.on_drop(&ElementRef::column(&other.id, "Doing")).unwrap(), vec![Action::ClearHighlights]);

    assert_eq!(engine.board(&board.id).unwrap().task(&t.id).unwrap().column, "To Do");
    assert!(engine.board(&other.id).unwrap().tasks.is_empty());
    assert_eq!(engine.log().len(), before);
}

#[test]
fn drag_end_without_drop_resets_state() {
    let (mut engine, _) = engine();
    let board = sprint(&mut engine);
    let t = engine.create_task(&board.id, "To Do", task("a")).unwrap();

    engine.on_drag_start(&ElementRef::task(&board.id, &t.id));
    assert_eq!(engine.on_drag_end(), vec![Action::ClearHighlights]);
    assert!(engine.drag_state().is_idle());
    assert!(engine.on_drag_end().is_empty());
    assert!(engine.on_drop(&ElementRef::column(&board.id, "Doing")).unwrap().is_empty());
}

#[test]
fn drag_start_ignores_non_tasks_and_unknown_tasks() {
    let (mut engine, _) = engine();
    let board = sprint(&mut engine);
    assert!(engine.on_drag_start(&ElementRef::column(&board.id, "To Do")).is_empty());
    assert!(engine.on_drag_start(&ElementRef::task(&board.id, "ghost")).is_empty());
    assert!(engine.drag_state().is_idle());
    assert!(engine.on_drag_over(&ElementRef::column(&board.id, "Doing")).is_empty());
}

#[test]
fn repeated_drag_over_same_column_emits_once() {
    let (mut engine, _) = engine();
    let board = sprint(&mut engine);
    let t = engine.create_task(&board.id, "To Do", task("a")).unwrap();
    engine.on_drag_start(&ElementRef::task(&board.id, &t.id));
    assert_eq!(engine.on_drag_over(&ElementRef::column(&board.id, "Done")).len(), 2);
    assert!(engine.on_drag_over(&ElementRef::column(&board.id, "Done")).is_empty());
}

#[test]
fn deleting_dragged_task_cancels_gesture() {
    let (mut engine, _) = engine();
    let board = sprint(&mut engine);
    let t = engine.create_task(&board.id, "To Do", task("a")).unwrap();
    engine.on_drag_start(&ElementRef::task(&board.id, &t.id));
    assert_eq!(engine.delete_task(&board.id, &t.id, &mut AssumeYes).unwrap(), Outcome::Applied);
    assert!(engine.drag_state().is_idle());
}

// =============================================================
// Persistence
// =============================================================

#[test]
fn load_restores_saved_boards() {
    let (mut engine, storage) = engine();
    let board = sprint(&mut engine);
    engine.create_task(&board.id, "Doing", task("a")).unwrap();

    let mut reopened = EngineCore::new(Box::new(storage));
    assert_eq!(reopened.load().unwrap(), 1);
    assert_eq!(reopened.boards(), engine.boards());
    assert!(reopened.log().is_empty());
}

#[test]
fn load_without_snapshot_is_empty() {
    let (mut engine, _) = engine();
    assert_eq!(engine.load().unwrap(), 0);
    assert!(engine.boards().is_empty());
}

#[test]
fn corrupt_snapshot_keeps_current_boards() {
    let (mut engine, mut storage) = engine();
    sprint(&mut engine);
    storage.write(STORAGE_KEY, "{ not json").unwrap();

    let err = engine.load().unwrap_err();
    assert!(matches!(err, EngineError::Snapshot(_)));
    assert_eq!(err.error_code(), "E_SNAPSHOT_PARSE");
    assert_eq!(engine.boards().len(), 1);
}

#[test]
fn quarantine_moves_corrupt_snapshot_aside() {
    let (mut engine, mut storage) = engine();
    storage.write(STORAGE_KEY, "{ not json").unwrap();
    assert!(engine.load().is_err());

    let backup = engine.quarantine_snapshot().unwrap();
    assert_eq!(backup.as_deref(), Some("kanban_boards-corrupt"));
    assert_eq!(storage.read("kanban_boards-corrupt").unwrap().as_deref(), Some("{ not json"));
    assert_eq!(storage.read(STORAGE_KEY).unwrap(), None);

    sprint(&mut engine);
    assert_eq!(persisted(&storage).boards.len(), 1);
    assert_eq!(storage.read("kanban_boards-corrupt").unwrap().as_deref(), Some("{ not json"));
    assert_eq!(engine.quarantine_snapshot().unwrap().as_deref(), Some("kanban_boards-corrupt"));

    let (mut empty, _) = self::engine();
    assert_eq!(empty.quarantine_snapshot().unwrap(), None);
}

#[test]
fn custom_storage_key_is_used() {
    let storage = SharedStorage::default();
    let mut engine = EngineCore::new(Box::new(storage.clone())).with_storage_key("team_boards");
    sprint(&mut engine);
    assert!(storage.read("team_boards").unwrap().is_some());
    assert!(storage.read(STORAGE_KEY).unwrap().is_none());
}

// =============================================================
// Import / export
// =============================================================

#[test]
fn export_then_import_round_trips() {
    let (mut engine, _) = engine();
    let board = sprint(&mut engine);
    engine.create_task(&board.id, "Doing", task("a")).unwrap();
    let now = datetime!(2026-03-02 10:00 UTC);

    let (filename, json) = engine.export(now).unwrap();
    assert_eq!(filename, "kanban-export-2026-03-02.json");

    let (mut other, storage) = self::engine();
    assert_eq!(other.import(&json).unwrap(), 1);
    assert_eq!(other.boards(), engine.boards());
    assert_eq!(persisted(&storage).boards, engine.boards());
    assert_eq!(newest_message(&other), "Imported 1 board(s)");
}

#[test]
fn rejected_import_leaves_store_untouched() {
    let (mut engine, storage) = engine();
    let board = sprint(&mut engine);
    let before = engine.log().len();

    let err = engine.import(r#"{"boards":"not-an-array"}"#).unwrap_err();
    assert_eq!(err.to_string(), "Invalid file format: missing boards array");
    assert!(engine.import("garbage").is_err());

    assert_eq!(engine.boards().len(), 1);
    assert_eq!(engine.boards()[0].id, board.id);
    assert_eq!(persisted(&storage).boards.len(), 1);
    assert_eq!(engine.log().len(), before);
}

#[test]
fn import_with_duplicate_ids_leaves_store_untouched() {
    let (mut engine, storage) = engine();
    let board = sprint(&mut engine);
    engine.create_task(&board.id, "To Do", task("a")).unwrap();
    let (_, json) = engine.export(datetime!(2026-03-02 10:00 UTC)).unwrap();
    let mut doc: serde_json::Value = serde_json::from_str(&json).unwrap();
    let copy = doc["boards"][0].clone();
    doc["boards"].as_array_mut().unwrap().push(copy);

    let err = engine.import(&doc.to_string()).unwrap_err();
    assert_eq!(err.error_code(), "E_IMPORT_DUPLICATE_ID");
    assert_eq!(engine.boards().len(), 1);
    assert_eq!(persisted(&storage).boards.len(), 1);
}

// =============================================================
// Forms
// =============================================================

#[test]
fn board_form_create_and_edit() {
    let (mut engine, _) = engine();
    let form = engine.open_board_form(None).unwrap();
    assert_eq!(form.columns, "To Do, In Progress, Done");
    form.name = "Roadmap".to_owned();
    form.columns = "Now, Next, Later".to_owned();
    let board = engine.submit_board_form().unwrap();
    assert_eq!(board.columns, vec!["Now", "Next", "Later"]);
    assert!(engine.board_form_mut().is_none());

    let form = engine.open_board_form(Some(&board.id)).unwrap();
    assert_eq!(form.name, "Roadmap");
    form.name = "Roadmap 2026".to_owned();
    engine.submit_board_form().unwrap();
    assert_eq!(engine.boards().len(), 1);
    assert_eq!(engine.boards()[0].name, "Roadmap 2026");
}

#[test]
fn invalid_form_stays_open() {
    let (mut engine, _) = engine();
    engine.open_board_form(None).unwrap().name = "   ".to_owned();
    let err = engine.submit_board_form().unwrap_err();
    assert_eq!(err.error_code(), "E_FIELD_REQUIRED");
    assert!(engine.board_form_mut().is_some());
    assert!(engine.boards().is_empty());

    engine.cancel_board_form();
    assert!(matches!(engine.submit_board_form(), Err(EngineError::NoOpenForm("board"))));
}

#[test]
fn task_form_create_and_edit() {
    let (mut engine, _) = engine();
    let board = sprint(&mut engine);
    let form = engine.open_task_form(&board.id, "Doing").unwrap();
    form.title = "Fix login".to_owned();
    form.priority = "urgent".to_owned();
    form.labels = "auth, , bug".to_owned();
    let t = engine.submit_task_form().unwrap();
    assert_eq!(t.column, "Doing");
    assert_eq!(t.priority, Priority::Medium);
    assert_eq!(t.labels, vec!["auth", "bug"]);

    let form = engine.open_task_edit_form(&board.id, &t.id).unwrap();
    assert_eq!(form.labels, "auth, bug");
    form.assignee = "ana".to_owned();
    engine.submit_task_form().unwrap();
    let edited = engine.board(&board.id).unwrap().task(&t.id).unwrap();
    assert_eq!(edited.assignee.as_deref(), Some("ana"));
    assert_eq!(edited.column, "Doing");

    engine.open_task_form(&board.id, "To Do").unwrap();
    engine.cancel_task_form();
    assert!(engine.task_form_mut().is_none());
    assert!(engine.open_task_form("missing", "To Do").is_err());
}

#[test]
fn task_form_column_is_trimmed() {
    let (mut engine, _) = engine();
    let board = sprint(&mut engine);
    engine.open_task_form(&board.id, " Doing ").unwrap().title = "Fix login".to_owned();
    let t = engine.submit_task_form().unwrap();
    assert_eq!(t.column, "Doing");
    assert_eq!(engine.board(&board.id).unwrap().tasks_in("Doing").count(), 1);
}

// =============================================================
// Queries
// =============================================================

#[test]
fn search_and_stats_cover_all_boards() {
    let (mut engine, _) = engine();
    let a = sprint(&mut engine);
    let b = sprint(&mut engine);
    engine.create_task(&a.id, "To Do", task("Fix login")).unwrap();
    engine.create_task(&b.id, "Done", task("Login page")).unwrap();
    engine.create_task(&b.id, "Doing", task("Docs")).unwrap();

    assert_eq!(engine.search("LOGIN").len(), 2);
    let stats = engine.stats(datetime!(2026-01-01 00:00 UTC));
    assert_eq!(stats.boards, 2);
    assert_eq!(stats.tasks, 3);
    assert_eq!(stats.done, 1);
    assert_eq!(stats.by_priority[&Priority::Medium], 3);
}
