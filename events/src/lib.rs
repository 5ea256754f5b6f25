//! Typed mutation events, the publish/subscribe bus, and the capped event log.
//!
//! This crate is UI-framework agnostic so the board engine and any host can
//! share it. Mutations are broadcast as [`Event`] values on an [`EventBus`];
//! the [`EventLog`] is one subscriber among many and never feeds back into
//! the store.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Maximum number of entries the event log retains.
pub const EVENT_LOG_CAPACITY: usize = 20;

// =============================================================================
// EVENTS
// =============================================================================

/// Coarse category of an event, as shown in the log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "board-event")]
    Board,
    #[serde(rename = "task-event")]
    Task,
}

/// A store mutation, broadcast after it has been applied and persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    BoardCreated { board_id: String, name: String },
    BoardUpdated { board_id: String, name: String },
    BoardDeleted { board_id: String, name: String, task_count: usize },
    TaskCreated { board_id: String, task_id: String, title: String, column: String },
    TaskUpdated { board_id: String, task_id: String, title: String },
    TaskDeleted { board_id: String, task_id: String, title: String },
    TaskMoved { board_id: String, task_id: String, title: String, from: String, to: String },
    DataImported { board_count: usize },
    DataCleared { board_count: usize },
}

impl Event {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::TaskCreated { .. }
            | Self::TaskUpdated { .. }
            | Self::TaskDeleted { .. }
            | Self::TaskMoved { .. } => EventKind::Task,
            Self::BoardCreated { .. }
            | Self::BoardUpdated { .. }
            | Self::BoardDeleted { .. }
            | Self::DataImported { .. }
            | Self::DataCleared { .. } => EventKind::Board,
        }
    }

    /// Human-readable one-line description used by the log.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::BoardCreated { name, .. } => format!("Board \"{name}\" created"),
            Self::BoardUpdated { name, .. } => format!("Board \"{name}\" updated"),
            Self::BoardDeleted { name, task_count, .. } => {
                format!("Board \"{name}\" deleted with {task_count} task(s)")
            }
            Self::TaskCreated { title, column, .. } => format!("Task \"{title}\" created in {column}"),
            Self::TaskUpdated { title, .. } => format!("Task \"{title}\" updated"),
            Self::TaskDeleted { title, .. } => format!("Task \"{title}\" deleted"),
            Self::TaskMoved { title, from, to, .. } => format!("Task \"{title}\" moved from {from} to {to}"),
            Self::DataImported { board_count } => format!("Imported {board_count} board(s)"),
            Self::DataCleared { board_count } => format!("Cleared {board_count} board(s)"),
        }
    }

    /// The board the event concerns, if it concerns exactly one.
    #[must_use]
    pub fn board_id(&self) -> Option<&str> {
        match self {
            Self::BoardCreated { board_id, .. }
            | Self::BoardUpdated { board_id, .. }
            | Self::BoardDeleted { board_id, .. }
            | Self::TaskCreated { board_id, .. }
            | Self::TaskUpdated { board_id, .. }
            | Self::TaskDeleted { board_id, .. }
            | Self::TaskMoved { board_id, .. } => Some(board_id),
            Self::DataImported { .. } | Self::DataCleared { .. } => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct KindDisplay {
    pub letter: &'static str,
    pub label: &'static str,
    pub color: &'static str,
}

#[must_use]
pub fn kind_display(kind: EventKind) -> KindDisplay {
    match kind {
        EventKind::Board => KindDisplay {
            letter: "B",
            label: "BOARD",
            color: "#5b9bd5",
        },
        EventKind::Task => KindDisplay {
            letter: "T",
            label: "TASK",
            color: "#e6a23c",
        },
    }
}

// =============================================================================
// BUS
// =============================================================================

/// Receiver of published events.
pub trait Subscriber {
    fn notify(&mut self, event: &Event);
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Explicit publish/subscribe registry. Delivery is synchronous and in
/// subscription order.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Rc<RefCell<dyn Subscriber>>)>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscriber: Rc<RefCell<dyn Subscriber>>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, subscriber));
        id
    }

    /// Returns `false` if the id was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
        self.subscribers.len() != before
    }

    pub fn publish(&self, event: &Event) {
        for (_, subscriber) in &self.subscribers {
            subscriber.borrow_mut().notify(event);
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

// =============================================================================
// LOG
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Newest-first list of recent events, bounded by a capacity.
#[derive(Clone, Debug)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(EVENT_LOG_CAPACITY)
    }
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Prepend an entry for `event`, evicting the oldest past capacity.
    pub fn record(&mut self, event: &Event, at: OffsetDateTime) {
        self.entries.push_front(LogEntry {
            kind: event.kind(),
            message: event.message(),
            timestamp: at,
        });
        self.entries.truncate(self.capacity);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries ordered newest first.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Subscriber for EventLog {
    fn notify(&mut self, event: &Event) {
        self.record(event, OffsetDateTime::now_utc());
    }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
