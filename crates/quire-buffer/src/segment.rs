//! Offset/length segments.
//!
//! ## Learning: Range Types
//!
//! Rust's `Range<usize>` stores start and end; text APIs here talk in
//! `(offset, length)` pairs instead, because that is what edits and lines
//! carry around. `SimpleSegment` converts to and from `Range<usize>` for
//! places where slicing syntax is nicer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Anything that covers a contiguous range of a document.
pub trait Segment {
    /// Start offset of the segment.
    fn offset(&self) -> usize;

    /// Number of characters covered.
    fn length(&self) -> usize;

    /// Offset just past the segment.
    fn end_offset(&self) -> usize {
        self.offset() + self.length()
    }
}

/// A plain `(offset, length)` segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SimpleSegment {
    /// Start offset
    pub offset: usize,
    /// Length in characters
    pub length: usize,
}

impl SimpleSegment {
    /// Creates a new segment.
    pub const fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    /// Creates a segment from start and end offsets (normalized).
    pub fn from_offsets(start: usize, end: usize) -> Self {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        Self::new(start, end - start)
    }

    /// Returns true if the segment covers no characters.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns true if `offset` lies within the segment; the end offset
    /// counts as inside.
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.offset && offset <= self.end_offset()
    }

    /// The overlap of two segments, if they touch.
    pub fn intersection(&self, other: &SimpleSegment) -> Option<SimpleSegment> {
        let start = self.offset.max(other.offset);
        let end = self.end_offset().min(other.end_offset());
        (start <= end).then(|| SimpleSegment::from_offsets(start, end))
    }

    /// The segment as a range.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.end_offset()
    }
}

impl Segment for SimpleSegment {
    fn offset(&self) -> usize {
        self.offset
    }

    fn length(&self) -> usize {
        self.length
    }
}

impl From<Range<usize>> for SimpleSegment {
    fn from(range: Range<usize>) -> Self {
        Self::from_offsets(range.start, range.end)
    }
}

impl fmt::Display for SimpleSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Offset={}, Length={}]", self.offset, self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        let seg = SimpleSegment::from_offsets(10, 4);
        assert_eq!(seg, SimpleSegment::new(4, 6));
        assert_eq!(seg.end_offset(), 10);
        assert_eq!(SimpleSegment::from(2..5), SimpleSegment::new(2, 3));
    }

    #[test]
    fn test_contains_includes_end() {
        let seg = SimpleSegment::new(3, 2);
        assert!(!seg.contains(2));
        assert!(seg.contains(3));
        assert!(seg.contains(5));
        assert!(!seg.contains(6));
    }

    #[test]
    fn test_intersection() {
        let a = SimpleSegment::new(0, 5);
        let b = SimpleSegment::new(3, 5);
        assert_eq!(a.intersection(&b), Some(SimpleSegment::new(3, 2)));
        assert_eq!(a.intersection(&SimpleSegment::new(5, 1)), Some(SimpleSegment::new(5, 0)));
        assert_eq!(a.intersection(&SimpleSegment::new(6, 1)), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(SimpleSegment::new(1, 2).to_string(), "[Offset=1, Length=2]");
    }
}
