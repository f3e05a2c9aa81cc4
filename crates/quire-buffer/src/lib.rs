//! # Quire Buffer
//!
//! The text layer underneath a Quire document: a rope-backed character
//! buffer, immutable text snapshots, offset mapping for edits and the
//! version chain used to translate offsets between points in history.
//!
//! ## Key Concepts
//!
//! ### Offsets
//! - Every offset and length in this crate counts `char`s (Unicode scalar
//!   values), never bytes and never UTF-16 code units
//! - Hosts that address text in UTF-16 code units convert at the edge with
//!   `TextBuffer::char_to_utf16` / `TextBuffer::utf16_to_char`
//! - Ranges are given as `(offset, length)` pairs and validated against
//!   `[0, len]`; nothing is silently clamped
//!
//! ### Snapshots
//! - `TextBuffer::snapshot()` is O(1): the rope shares its chunks and copies
//!   on write, so a snapshot never observes later edits
//! - `RopeTextSource` pairs such a snapshot with the `Version` it was taken at
//!
//! ### Change descriptions
//! - `TextChangeEventArgs` / `DocumentChangeEventArgs` describe one edit
//! - `OffsetChangeMap` refines how offsets inside an edit are remapped
//! - `VersionProvider` links versions together so that an offset from an old
//!   version can be moved to a newer one (or back)

mod buffer;
mod change;
mod location;
mod newline;
mod segment;
mod source;
mod version;

pub use buffer::TextBuffer;
pub use change::{
    AnchorMovementType, DocumentChangeEventArgs, OffsetChangeMap, OffsetChangeMapEntry,
    OffsetChangeMappingType, TextChangeEventArgs,
};
pub use location::TextLocation;
pub use newline::{
    NEWLINE_STRINGS, NewLine, NewLineIter, is_newline, newlines, next_newline,
    next_newline_in_source, normalize_newlines,
};
pub use segment::{Segment, SimpleSegment};
pub use source::{RopeTextSource, SharedText, StringComparison, StringTextSource, TextSource};
pub use version::{Version, VersionProvider};

/// Result type for buffer operations
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur during buffer operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("Offset {offset} is out of range (text length {text_length})")]
    OffsetOutOfRange { offset: usize, text_length: usize },

    #[error("Range {offset}+{length} is out of range (text length {text_length})")]
    RangeOutOfRange {
        offset: usize,
        length: usize,
        text_length: usize,
    },

    #[error("Offset change map is not valid for change at {offset} (removed {removal_length}, inserted {insertion_length})")]
    InvalidOffsetChangeMap {
        offset: usize,
        removal_length: usize,
        insertion_length: usize,
    },

    #[error("Offset change map is frozen")]
    FrozenOffsetChangeMap,

    #[error("Versions do not belong to the same document")]
    VersionMismatch,
}
