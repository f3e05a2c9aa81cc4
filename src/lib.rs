//! # Quire
//!
//! A text document model for editors: a rope-backed buffer with a
//! red-black line tree, anchors that follow edits, a version chain for
//! translating offsets through history and synchronous change events.
//!
//! ## Quick Start
//!
//! ```
//! use quire::prelude::*;
//!
//! let mut document = Document::from_text("abc\ndef");
//! let anchor = document.create_anchor(4).unwrap();
//!
//! document.insert(2, "X\nY").unwrap();
//!
//! assert_eq!(document.text(), "abX\nYc\ndef");
//! assert_eq!(document.line_count(), 3);
//! assert_eq!(document.anchor_offset(anchor).unwrap(), 7);
//! ```
//!
//! ## Crates
//!
//! - `quire-buffer`: characters, snapshots, offset maps and versions
//! - `quire-core`: the `Document`, its line tree, anchors and events

pub use quire_buffer as buffer;
pub use quire_core as document;

pub use quire_buffer::{
    AnchorMovementType, BufferError, BufferResult, DocumentChangeEventArgs, NewLine,
    OffsetChangeMap, OffsetChangeMapEntry, OffsetChangeMappingType, RopeTextSource, Segment,
    SharedText, SimpleSegment, StringComparison, StringTextSource, TextChangeEventArgs, TextLocation,
    TextSource, Version,
};
pub use quire_core::{
    ConfigError, Document, DocumentConfig, DocumentError, DocumentId, DocumentLine,
    DocumentProperty, DocumentResult, EventList, LineId, LineTracker, LineTrackerHandle,
    SnapshotSource, Subscription, TextAnchor,
};

/// The types most callers need.
pub mod prelude {
    pub use quire_buffer::{AnchorMovementType, OffsetChangeMappingType, TextLocation, TextSource};
    pub use quire_core::{Document, DocumentConfig, DocumentError, DocumentResult, TextAnchor};
}
