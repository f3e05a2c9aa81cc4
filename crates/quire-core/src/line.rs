//! Read-only view of one line.
//!
//! ## Learning: Borrowed Views
//!
//! `DocumentLine<'a>` borrows the line tree, so the compiler guarantees that
//! no edit can happen while a view is alive. That is why its accessors don't
//! return `Result`: the handle was checked once when the view was made and
//! can't go stale afterwards. Keep a `LineId` to refer to a line across
//! edits.

use std::fmt;

use quire_buffer::Segment;

use crate::line_tree::{LineId, LineTree};

/// A line of a document, valid while the document is not being changed.
#[derive(Clone, Copy)]
pub struct DocumentLine<'a> {
    tree: &'a LineTree,
    idx: usize,
}

impl<'a> DocumentLine<'a> {
    pub(crate) fn new(tree: &'a LineTree, idx: usize) -> Self {
        Self { tree, idx }
    }

    /// Stable handle to this line.
    pub fn id(&self) -> LineId {
        self.tree.id_at(self.idx)
    }

    /// Start offset of the line.
    pub fn offset(&self) -> usize {
        self.tree.offset_at(self.idx)
    }

    /// Offset of the end of the line, excluding the delimiter.
    pub fn end_offset(&self) -> usize {
        self.offset() + self.length()
    }

    /// Length excluding the delimiter.
    pub fn length(&self) -> usize {
        self.total_length() - self.delimiter_length()
    }

    /// Length including the delimiter.
    pub fn total_length(&self) -> usize {
        self.tree.total_length_at(self.idx)
    }

    /// 0 for the last line, 1 for `\n` or `\r`, 2 for `\r\n`.
    pub fn delimiter_length(&self) -> usize {
        self.tree.delimiter_length_at(self.idx)
    }

    /// 1-based line number. O(log n).
    pub fn line_number(&self) -> usize {
        self.tree.line_number_at(self.idx)
    }

    pub fn next_line(&self) -> Option<DocumentLine<'a>> {
        self.tree.next_at(self.idx).map(|idx| DocumentLine::new(self.tree, idx))
    }

    pub fn previous_line(&self) -> Option<DocumentLine<'a>> {
        self.tree
            .previous_at(self.idx)
            .map(|idx| DocumentLine::new(self.tree, idx))
    }

    /// Returns true for the last line of the document.
    pub fn is_last_line(&self) -> bool {
        self.tree.next_at(self.idx).is_none()
    }
}

impl Segment for DocumentLine<'_> {
    fn offset(&self) -> usize {
        DocumentLine::offset(self)
    }

    fn length(&self) -> usize {
        DocumentLine::length(self)
    }
}

impl PartialEq for DocumentLine<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.idx == other.idx
    }
}

impl Eq for DocumentLine<'_> {}

impl fmt::Debug for DocumentLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentLine")
            .field("number", &self.line_number())
            .field("offset", &self.offset())
            .field("length", &self.length())
            .field("delimiter_length", &self.delimiter_length())
            .finish()
    }
}

impl fmt::Display for DocumentLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[DocumentLine Number={} Offset={} Length={}]",
            self.line_number(),
            self.offset(),
            self.length()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_accessors() {
        let mut tree = LineTree::new();
        let first = tree.first_line().id();
        let idx = tree.resolve(first).unwrap();
        tree.set_total_length(idx, 4);
        tree.set_delimiter_length(idx, 2);
        let second = tree.insert_line_after(first, 3).unwrap();

        let line = tree.line(second).unwrap();
        assert_eq!(line.offset(), 4);
        assert_eq!(line.length(), 3);
        assert_eq!(line.end_offset(), 7);
        assert!(line.is_last_line());
        assert_eq!(line.previous_line().map(|l| l.id()), Some(first));
        assert_eq!(line.to_string(), "[DocumentLine Number=2 Offset=4 Length=3]");

        let head = tree.first_line();
        assert_eq!(head.length(), 2);
        assert_eq!(Segment::end_offset(&head), 2);
        assert_eq!(head.next_line(), Some(line));
    }
}
