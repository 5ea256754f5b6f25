//! Rendering: projects the board store into markup.
//!
//! Every function here is pure. It receives read-only boards and the
//! current time, and returns a fresh string. Nothing is diffed; the host
//! replaces the whole board container after each mutation. Rendering twice
//! with the same inputs yields identical output.
//!
//! Task cards and columns carry the data attributes read back by
//! [`crate::hit::ElementRef::from_dataset`].

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use events::{LogEntry, kind_display};
use time::OffsetDateTime;
use time::macros::format_description;

use crate::doc::{Board, Task, task_matches};
use crate::hit::{ATTR_BOARD_ID, ATTR_COLUMN, ATTR_TASK_ID};

/// Shown when there are no boards at all.
pub const EMPTY_STATE_TEXT: &str = "No boards yet. Create your first board to get started!";

const PAGE_STYLE: &str = "body{font-family:sans-serif;margin:1rem;background:#f4f5f7}\
.board{background:#fff;border-radius:8px;margin-bottom:1rem;padding:1rem}\
.board-header{display:flex;align-items:center;gap:.5rem}\
.board-color{display:inline-block;width:1rem;height:1rem;border-radius:50%}\
.board-columns{display:flex;gap:1rem;overflow-x:auto}\
.column{background:#ebecf0;border-radius:6px;min-width:240px;padding:.5rem}\
.task-card{background:#fff;border-radius:4px;margin:.5rem 0;padding:.5rem;border-left:4px solid #999}\
.task-card.priority-low{border-color:#10b981}.task-card.priority-medium{border-color:#f59e0b}\
.task-card.priority-high{border-color:#ef4444}.task-card.priority-critical{border-color:#7c3aed}\
.task-card.overdue{background:#fef2f2}.overdue-indicator{color:#dc2626;font-weight:bold}\
.event-log li{font-size:.85rem}";

/// Escape text for use in element content and quoted attribute values.
#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// =============================================================================
// MARKUP
// =============================================================================

/// Markup for the board container. `filter` restricts which task cards are
/// shown; column counts always reflect every task in the column.
#[must_use]
pub fn render_boards(boards: &[Board], now: OffsetDateTime, filter: Option<&str>) -> String {
    if boards.is_empty() {
        return format!(
            "<div class=\"empty-state\"><p>{}</p><button id=\"create-first-board\">Create Board</button></div>",
            escape_html(EMPTY_STATE_TEXT)
        );
    }
    let mut out = String::new();
    for board in boards {
        render_board(&mut out, board, now, filter);
    }
    out
}

fn render_board(out: &mut String, board: &Board, now: OffsetDateTime, filter: Option<&str>) {
    let id = escape_html(&board.id);
    let color = escape_html(&board.color);
    let name = escape_html(&board.name);
    out.push_str(&format!("<div class=\"board\" {ATTR_BOARD_ID}=\"{id}\">\
<div class=\"board-header\">\
<span class=\"board-color\" style=\"background-color: {color}\"></span>\
<h2 class=\"board-title\">{name}</h2>\
<div class=\"board-actions\">\
<button class=\"edit-board-btn\" {ATTR_BOARD_ID}=\"{id}\">Edit</button>\
<button class=\"delete-board-btn\" {ATTR_BOARD_ID}=\"{id}\">Delete</button>\
</div></div><div class=\"board-columns\">"
    ));
    for column in &board.columns {
        render_column(out, board, column, now, filter);
    }
    out.push_str("</div></div>");
}

fn render_column(out: &mut String, board: &Board, column: &str, now: OffsetDateTime, filter: Option<&str>) {
    let board_id = escape_html(&board.id);
    let name = escape_html(column);
    out.push_str(&format!("<div class=\"column\" {ATTR_BOARD_ID}=\"{board_id}\" {ATTR_COLUMN}=\"{name}\">\
<div class=\"column-header\"><h3>{name}</h3><span class=\"task-count\">{count}</span></div>\
<div class=\"task-list\">",
        count = board.column_count(column),
    ));
    for task in board.tasks_in(column) {
        if filter.is_none_or(|q| task_matches(task, q)) {
            render_task_card(out, &board.id, task, now);
        }
    }
    out.push_str(&format!("</div><button class=\"add-task-btn\" {ATTR_BOARD_ID}=\"{board_id}\" {ATTR_COLUMN}=\"{name}\">+ Add Task</button></div>"
    ));
}

fn render_task_card(out: &mut String, board_id: &str, task: &Task, now: OffsetDateTime) {
    let overdue = task.is_overdue(now);
    let board_id = escape_html(board_id);
    let task_id = escape_html(&task.id);
    let priority = task.priority.as_str();
    out.push_str(&format!("<div class=\"task-card priority-{priority}{overdue_class}\" draggable=\"true\" {ATTR_BOARD_ID}=\"{board_id}\" {ATTR_TASK_ID}=\"{task_id}\">\
<div class=\"task-header\"><h4 class=\"task-title\">{title}</h4>\
<span class=\"priority-tag priority-{priority}\">{priority}</span></div>",
        overdue_class = if overdue { " overdue" } else { "" },
        title = escape_html(&task.title),
    ));
    if let Some(description) = &task.description {
        out.push_str(&format!("<p class=\"task-description\">{}</p>", escape_html(description)));
    }
    if !task.labels.is_empty() {
        out.push_str("<div class=\"task-labels\">");
        for label in &task.labels {
            out.push_str(&format!("<span class=\"task-label\">{}</span>", escape_html(label)));
        }
        out.push_str("</div>");
    }
    out.push_str("<div class=\"task-meta\">");
    if let Some(assignee) = &task.assignee {
        out.push_str(&format!("<span class=\"task-assignee\">{}</span>", escape_html(assignee)));
    }
    if let Some(due) = &task.due_date {
        out.push_str(&format!("<span class=\"task-due\">Due {}</span>", escape_html(due)));
    }
    if overdue {
        out.push_str("<span class=\"overdue-indicator\">Overdue</span>");
    }
    out.push_str(&format!("</div><div class=\"task-actions\">\
<button class=\"edit-task-btn\" {ATTR_BOARD_ID}=\"{board_id}\" {ATTR_TASK_ID}=\"{task_id}\">Edit</button>\
<button class=\"delete-task-btn\" {ATTR_BOARD_ID}=\"{board_id}\" {ATTR_TASK_ID}=\"{task_id}\">Delete</button>\
</div></div>"
    ));
}

/// Markup for the event log list, newest first as given.
#[must_use]
pub fn render_event_log<'a>(entries: impl IntoIterator<Item = &'a LogEntry>) -> String {
    let clock = format_description!("[hour]:[minute]:[second]");
    let mut out = String::from("<ul class=\"event-log\">");
    for entry in entries {
        let display = kind_display(entry.kind);
        let at = entry.timestamp.format(&clock).unwrap_or_default();
        out.push_str(&format!("<li class=\"event-entry\"><span class=\"event-kind\" style=\"color: {color}\">{letter}</span> \
<span class=\"event-message\">{message}</span> <time>{at}</time></li>",
            color = display.color,
            letter = display.letter,
            message = escape_html(&entry.message),
        ));
    }
    out.push_str("</ul>");
    out
}

/// Standalone document: page shell, board container, and event log.
#[must_use]
pub fn render_page<'a>(
    boards: &[Board],
    log: impl IntoIterator<Item = &'a LogEntry>,
    now: OffsetDateTime,
    filter: Option<&str>,
) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\"><title>Kanban</title>\
<style>{PAGE_STYLE}</style></head><body>\
<header><h1>Kanban</h1><button id=\"create-board-btn\">New Board</button></header>\
<main id=\"boards-container\">{boards}</main>\
<aside id=\"event-log\"><h2>Recent activity</h2>{log}<button id=\"clear-log-btn\">Clear</button></aside>\
</body></html>\n",
        boards = render_boards(boards, now, filter),
        log = render_event_log(log),
    )
}

// =============================================================================
// PLAIN TEXT
// =============================================================================

/// Terminal lane view with the same content as the markup.
#[must_use]
pub fn render_plain(boards: &[Board], now: OffsetDateTime, filter: Option<&str>) -> String {
    if boards.is_empty() {
        return format!("{EMPTY_STATE_TEXT}\n");
    }
    let mut out = String::new();
    for board in boards {
        out.push_str(&format!("== {} [{}] ({})\n", board.name, board.color, board.id));
        for column in &board.columns {
            out.push_str(&format!("  {column} ({})\n", board.column_count(column)));
            for task in board.tasks_in(column) {
                if filter.is_none_or(|q| task_matches(task, q)) {
                    render_plain_task(&mut out, task, now);
                }
            }
        }
    }
    out
}

fn render_plain_task(out: &mut String, task: &Task, now: OffsetDateTime) {
    out.push_str(&format!("    - [{}] {} ({})", task.priority, task.title, task.id));
    if let Some(due) = &task.due_date {
        out.push_str(&format!(" due {due}"));
    }
    if task.is_overdue(now) {
        out.push_str(" OVERDUE");
    }
    if let Some(assignee) = &task.assignee {
        out.push_str(&format!(" @{assignee}"));
    }
    for label in &task.labels {
        out.push_str(&format!(" #{label}"));
    }
    out.push('\n');
    if let Some(description) = &task.description {
        out.push_str(&format!("      {description}\n"));
    }
}
