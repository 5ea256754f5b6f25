//! Kanban board engine: boards, columns, tasks, and drag-and-drop moves.
//!
//! The crate owns the whole lifecycle of a board session. It keeps the
//! in-memory store, persists snapshots through a [`storage::Storage`] backend,
//! turns element references from the host into drag gestures, validates modal
//! forms, and publishes an [`events::Event`] for every mutation. The host is
//! responsible only for wiring its input to [`engine::EngineCore`] and
//! displaying the markup produced by [`render`].
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | [`engine::EngineCore`]: the context object every interaction goes through |
//! | [`doc`] | Board and task types and the in-memory [`doc::BoardStore`] |
//! | [`storage`] | Key/value snapshot persistence (memory and file backends) |
//! | [`input`] | Drag gesture state machine |
//! | [`hit`] | Element references parsed from data attributes |
//! | [`form`] | Board and task form state and validation |
//! | [`render`] | Markup and plain-text projections of the store |
//! | [`transfer`] | JSON export and import |
//! | [`consts`] | Defaults shared across modules |

pub mod consts;
pub mod doc;
pub mod engine;
pub mod form;
pub mod hit;
pub mod input;
pub mod render;
pub mod storage;
pub mod transfer;

/// Stable machine-readable code for an error variant.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;
}
