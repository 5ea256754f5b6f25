//! Shared constants for the board crate.

// ── Storage ─────────────────────────────────────────────────────

/// Storage key under which the board snapshot is persisted.
pub const STORAGE_KEY: &str = "kanban_boards";

// ── Defaults ────────────────────────────────────────────────────

/// Columns given to a board created without any.
pub const DEFAULT_COLUMNS: [&str; 3] = ["To Do", "In Progress", "Done"];

/// Swatch color for a board created without one.
pub const DEFAULT_BOARD_COLOR: &str = "#3b82f6";

/// Tasks in this column are never shown as overdue.
pub const DONE_COLUMN: &str = "Done";

// ── Ids ─────────────────────────────────────────────────────────

/// Length of the random suffix appended to generated ids.
pub const ID_SUFFIX_LEN: usize = 9;
