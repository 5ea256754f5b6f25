use std::path::PathBuf;

use board::consts::STORAGE_KEY;
use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "kanban", version, about = "Kanban boards with drag-and-drop task moves")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Directory holding the board snapshot.
    #[arg(long, env = "KANBAN_DATA_DIR", default_value = ".kanban", global = true)]
    pub data_dir: PathBuf,

    /// Snapshot key; the file is `<key>.json` in the data directory.
    #[arg(long, env = "KANBAN_STORAGE_KEY", default_value = STORAGE_KEY, global = true)]
    pub storage_key: String,

    /// Confirm destructive actions without prompting.
    #[arg(long, short = 'y', env = "KANBAN_ASSUME_YES", global = true)]
    pub yes: bool,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace). `KANBAN_LOG` wins when set.
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Manage boards.
    #[command(subcommand)]
    Board(BoardCommand),
    /// Manage tasks.
    #[command(subcommand)]
    Task(TaskCommand),
    /// Print every board as lanes.
    Show {
        #[arg(long)]
        search: Option<String>,
    },
    /// Write a standalone HTML page.
    Render {
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        search: Option<String>,
    },
    /// Find tasks across all boards.
    Search { query: String },
    /// Task counts across all boards.
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Write every board to a JSON export file.
    Export {
        /// Defaults to `kanban-export-YYYY-MM-DD.json` in the working directory.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replace every board with the contents of an export file.
    Import { file: PathBuf },
    /// Delete every board.
    Clear,
}

#[derive(Subcommand, Debug, Clone)]
pub enum BoardCommand {
    List,
    Create {
        #[arg(long)]
        name: String,
        #[command(flatten)]
        fields: BoardFields,
    },
    Edit {
        board_id: String,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: BoardFields,
    },
    Delete { board_id: String },
}

#[derive(Args, Debug, Clone, Default)]
pub struct BoardFields {
    #[arg(long)]
    pub color: Option<String>,
    /// Comma-separated column names.
    #[arg(long)]
    pub columns: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TaskCommand {
    Add {
        board_id: String,
        #[arg(long)]
        title: String,
        /// Defaults to the board's first column.
        #[arg(long)]
        column: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
    },
    Edit {
        board_id: String,
        task_id: String,
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
    },
    Delete { board_id: String, task_id: String },
    /// Drag a task onto another column of its board.
    Move { board_id: String, task_id: String, column: String },
}

#[derive(Args, Debug, Clone, Default)]
pub struct TaskFields {
    #[arg(long)]
    pub description: Option<String>,
    /// low, medium, high, or critical.
    #[arg(long)]
    pub priority: Option<String>,
    /// YYYY-MM-DD or RFC 3339.
    #[arg(long)]
    pub due: Option<String>,
    /// Comma-separated labels.
    #[arg(long)]
    pub labels: Option<String>,
    #[arg(long)]
    pub assignee: Option<String>,
}
