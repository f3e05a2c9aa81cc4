//! # Quire Core
//!
//! The document model built on top of `quire-buffer`.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Document                           │
//! │  ┌────────────┐  ┌──────────────┐  ┌──────────────────┐  │
//! │  │ TextBuffer │  │   LineTree   │  │   AnchorStore    │  │
//! │  └────────────┘  └──────┬───────┘  └──────────────────┘  │
//! │                         │ LineManager (per edit)         │
//! │                  ┌──────┴───────┐                        │
//! │                  │ LineTrackers │                        │
//! │                  └──────────────┘                        │
//! │  ┌─────────────────┐  ┌───────────────┐  ┌────────────┐  │
//! │  │ VersionProvider │  │ SnapshotSource│  │ EventLists │  │
//! │  └─────────────────┘  └───────────────┘  └────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Every edit goes through `Document::replace`. The buffer changes first,
//! then the line tree is patched (line trackers hear about every structural
//! step), then anchors move, and finally observers are told.
//!
//! ## Learning: Module Organization
//!
//! Rust modules map to files:
//! - `mod foo;` looks for `foo.rs` or `foo/mod.rs`
//! - `pub use` re-exports items for cleaner public APIs

pub mod anchor;
pub mod config;
pub mod document;
pub mod event;
pub mod line;
pub mod line_tracker;
pub mod line_tree;
mod line_manager;

pub use anchor::TextAnchor;
pub use config::{ConfigError, DocumentConfig};
pub use document::{Document, DocumentId, SnapshotSource};
pub use event::{DocumentProperty, EventList, Subscription};
pub use line::DocumentLine;
pub use line_tracker::{LineTracker, LineTrackerHandle};
pub use line_tree::{LineId, LineTree};

use quire_buffer::BufferError;

/// Result type for document operations
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Errors that can occur in document operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("Line number {line} is out of range (document has {line_count} lines)")]
    LineNumberOutOfRange { line: usize, line_count: usize },

    #[error("Line was deleted")]
    LineDeleted,

    #[error("Anchor was deleted")]
    AnchorDeleted,

    #[error("Cannot change the document while a change is being dispatched")]
    ChangeDuringChange,

    #[error("Cannot end an update while a change is being dispatched")]
    EndUpdateDuringChange,

    #[error("No update is active")]
    NoUpdateActive,
}

/// A broken structural invariant. Always an internal bug.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invariant violated: {0}")]
pub struct InvariantViolation(pub String);
