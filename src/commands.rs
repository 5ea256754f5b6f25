//! One function per subcommand. Each runs against an open engine and
//! returns the text to print; the caller prints the session log after.

#[cfg(test)]
#[path = "commands_test.rs"]
mod commands_test;

use std::fs;
use std::path::{Path, PathBuf};

use board::doc::{Board, BoardStats, Priority, StoreError, Task};
use board::engine::{Confirm, EngineCore, EngineError, Outcome};
use board::form::{BoardForm, TaskForm};
use board::hit::{ATTR_BOARD_ID, ATTR_COLUMN, ATTR_TASK_ID, ElementRef};
use board::render;
use events::{EventLog, kind_display};
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{info, warn};

use crate::CliError;
use crate::cli::{BoardCommand, BoardFields, Command, TaskCommand, TaskFields};

/// Run one command and return its output.
pub fn run(
    engine: &mut EngineCore,
    command: Command,
    confirm: &mut dyn Confirm,
    now: OffsetDateTime,
) -> Result<String, CliError> {
    match command {
        Command::Board(cmd) => run_board(engine, cmd, confirm),
        Command::Task(cmd) => run_task(engine, cmd, confirm),
        Command::Show { search } => Ok(render::render_plain(engine.boards(), now, search.as_deref())),
        Command::Render { out, search } => {
            let page = render::render_page(engine.boards(), engine.log().entries(), now, search.as_deref());
            write_file(&out, &page)?;
            Ok(format!("Wrote {}\n", out.display()))
        }
        Command::Search { query } => Ok(search(engine, &query)),
        Command::Stats { json } => {
            let stats = engine.stats(now);
            if json {
                Ok(format!("{}\n", serde_json::to_string_pretty(&stats)?))
            } else {
                Ok(format_stats(&stats))
            }
        }
        Command::Export { out } => {
            let (filename, contents) = engine.export(now)?;
            let path = out.unwrap_or_else(|| PathBuf::from(filename));
            write_file(&path, &contents)?;
            info!(path = %path.display(), boards = engine.boards().len(), "export written");
            Ok(format!("Exported {} board(s) to {}\n", engine.boards().len(), path.display()))
        }
        Command::Import { file } => {
            let contents = fs::read_to_string(&file).map_err(|source| CliError::Io {
                action: "read",
                path: file.clone(),
                source,
            })?;
            let count = engine.import(&contents)?;
            Ok(format!("Imported {count} board(s) from {}\n", file.display()))
        }
        Command::Clear => Ok(match engine.clear_all(confirm)? {
            Outcome::Applied => "All boards deleted\n".to_owned(),
            Outcome::Declined => "Clear cancelled\n".to_owned(),
        }),
    }
}

// =============================================================================
// BOARDS
// =============================================================================

fn run_board(engine: &mut EngineCore, cmd: BoardCommand, confirm: &mut dyn Confirm) -> Result<String, CliError> {
    match cmd {
        BoardCommand::List => Ok(list_boards(engine.boards())),
        BoardCommand::Create { name, fields } => {
            let form = engine.open_board_form(None)?;
            form.name = name;
            apply_board_fields(form, fields);
            let board = submit_board(engine)?;
            Ok(format!("Created board \"{}\" ({})\n", board.name, board.id))
        }
        BoardCommand::Edit { board_id, name, fields } => {
            let form = engine.open_board_form(Some(&board_id))?;
            if let Some(name) = name {
                form.name = name;
            }
            apply_board_fields(form, fields);
            let board = submit_board(engine)?;
            Ok(format!("Updated board \"{}\" ({})\n", board.name, board.id))
        }
        BoardCommand::Delete { board_id } => Ok(match engine.delete_board(&board_id, confirm)? {
            Outcome::Applied => format!("Deleted board {board_id}\n"),
            Outcome::Declined => "Delete cancelled\n".to_owned(),
        }),
    }
}

fn apply_board_fields(form: &mut BoardForm, fields: BoardFields) {
    if let Some(color) = fields.color {
        form.color = color;
    }
    if let Some(columns) = fields.columns {
        form.columns = columns;
    }
}

fn submit_board(engine: &mut EngineCore) -> Result<Board, CliError> {
    match engine.submit_board_form() {
        Ok(board) => Ok(board),
        Err(e) => {
            engine.cancel_board_form();
            Err(e.into())
        }
    }
}

fn list_boards(boards: &[Board]) -> String {
    if boards.is_empty() {
        return format!("{}\n", render::EMPTY_STATE_TEXT);
    }
    boards
        .iter()
        .map(|b| format!("{}  {}  {} task(s)  [{}]\n", b.id, b.name, b.tasks.len(), b.columns.join(" | ")))
        .collect()
}

// =============================================================================
// TASKS
// =============================================================================

fn run_task(engine: &mut EngineCore, cmd: TaskCommand, confirm: &mut dyn Confirm) -> Result<String, CliError> {
    match cmd {
        TaskCommand::Add { board_id, title, column, fields } => {
            let column = column
                .or_else(|| engine.board(&board_id).and_then(|b| b.columns.first().cloned()))
                .unwrap_or_default();
            let form = engine.open_task_form(&board_id, &column)?;
            form.title = title;
            apply_task_fields(form, fields);
            let task = submit_task(engine)?;
            Ok(format!("Created task \"{}\" ({}) in {}\n", task.title, task.id, task.column))
        }
        TaskCommand::Edit { board_id, task_id, title, fields } => {
            let form = engine.open_task_edit_form(&board_id, &task_id)?;
            if let Some(title) = title {
                form.title = title;
            }
            apply_task_fields(form, fields);
            let task = submit_task(engine)?;
            Ok(format!("Updated task \"{}\" ({})\n", task.title, task.id))
        }
        TaskCommand::Delete { board_id, task_id } => Ok(match engine.delete_task(&board_id, &task_id, confirm)? {
            Outcome::Applied => format!("Deleted task {task_id}\n"),
            Outcome::Declined => "Delete cancelled\n".to_owned(),
        }),
        TaskCommand::Move { board_id, task_id, column } => drag_to_column(engine, &board_id, &task_id, &column),
    }
}

fn apply_task_fields(form: &mut TaskForm, fields: TaskFields) {
    if let Some(description) = fields.description {
        form.description = description;
    }
    if let Some(priority) = fields.priority {
        if !Priority::ALL.iter().any(|p| p.as_str() == priority.trim().to_lowercase()) {
            warn!(priority = %priority, "unknown priority; using medium");
        }
        form.priority = priority;
    }
    if let Some(due) = fields.due {
        form.due_date = due;
    }
    if let Some(labels) = fields.labels {
        form.labels = labels;
    }
    if let Some(assignee) = fields.assignee {
        form.assignee = assignee;
    }
}

fn submit_task(engine: &mut EngineCore) -> Result<Task, CliError> {
    match engine.submit_task_form() {
        Ok(task) => Ok(task),
        Err(e) => {
            engine.cancel_task_form();
            Err(e.into())
        }
    }
}

/// Move a task by replaying the drag gesture a pointer would produce.
fn drag_to_column(engine: &mut EngineCore, board_id: &str, task_id: &str, column: &str) -> Result<String, CliError> {
    let card = ElementRef::from_dataset([(ATTR_BOARD_ID, board_id), (ATTR_TASK_ID, task_id)]);
    let lane = ElementRef::from_dataset([(ATTR_BOARD_ID, board_id), (ATTR_COLUMN, column)]);

    if engine.on_drag_start(&card).is_empty() {
        let missing = match engine.board(board_id) {
            None => StoreError::BoardNotFound(board_id.to_owned()),
            Some(_) => StoreError::TaskNotFound {
                board_id: board_id.to_owned(),
                task_id: task_id.to_owned(),
            },
        };
        return Err(EngineError::from(missing).into());
    }
    engine.on_drag_over(&lane);
    engine.on_drop(&lane)?;
    Ok(format!("Moved task {task_id} to {column}\n"))
}

// =============================================================================
// QUERIES
// =============================================================================

fn search(engine: &EngineCore, query: &str) -> String {
    let hits = engine.search(query);
    if hits.is_empty() {
        return format!("No tasks match \"{}\"\n", query.trim());
    }
    hits.iter()
        .map(|(board, task)| format!("{} / {}: [{}] {} ({})\n", board.name, task.column, task.priority, task.title, task.id))
        .collect()
}

fn format_stats(stats: &BoardStats) -> String {
    let mut out = format!(
        "boards: {}\ntasks: {}\ndone: {}\noverdue: {}\n",
        stats.boards, stats.tasks, stats.done, stats.overdue
    );
    for (priority, count) in &stats.by_priority {
        out.push_str(&format!("  {priority}: {count}\n"));
    }
    out
}

/// Session log lines, newest first.
pub fn format_log(log: &EventLog) -> String {
    let clock = format_description!("[hour]:[minute]:[second]");
    log.entries()
        .map(|entry| {
            let at = entry.timestamp.format(&clock).unwrap_or_default();
            format!("{at} [{}] {}\n", kind_display(entry.kind).label, entry.message)
        })
        .collect()
}

fn write_file(path: &Path, contents: &str) -> Result<(), CliError> {
    fs::write(path, contents).map_err(|source| CliError::Io {
        action: "write",
        path: path.to_path_buf(),
        source,
    })
}
