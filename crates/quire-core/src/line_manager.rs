//! Keeps the line tree in step with the buffer.
//!
//! The manager is created for a single step of an edit from disjoint
//! borrows of the document: the line tree to patch, the buffer as it looks
//! after the step, and the trackers to notify. The buffer is changed first;
//! the tree still holds the old line lengths and is patched here.
//!
//! Every structural step goes through `set_line_length`,
//! `insert_line_after` or `remove_line`, which tell the trackers before the
//! tree changes.

use quire_buffer::{BufferError, DocumentChangeEventArgs, NewLineIter, TextBuffer, TextSource};

use crate::line::DocumentLine;
use crate::line_tracker::SharedTracker;
use crate::line_tree::{LineLengths, LineTree};
use crate::DocumentResult;

pub(crate) struct LineManager<'a> {
    tree: &'a mut LineTree,
    buffer: &'a TextBuffer,
    trackers: &'a [SharedTracker],
}

impl<'a> LineManager<'a> {
    pub(crate) fn new(tree: &'a mut LineTree, buffer: &'a TextBuffer, trackers: &'a [SharedTracker]) -> Self {
        Self {
            tree,
            buffer,
            trackers,
        }
    }

    /// `length` characters were inserted into the buffer at `offset`.
    pub(crate) fn insert(&mut self, offset: usize, length: usize) -> DocumentResult<()> {
        let buffer = self.buffer;
        let mut line = self.line_at(offset)?;
        let line_offset = self.tree.offset_at(line);
        let total = self.tree.total_length_at(line);
        if offset > line_offset + total - self.tree.delimiter_length_at(line) {
            // inserting between \r and \n: split the delimiter first
            self.set_line_length(line, total - 1);
            line = self.insert_line_after(line, 1);
            line = self.set_line_length(line, 1);
        }

        let mut last_delimiter_end = 0;
        for delimiter in NewLineIter::new(buffer.chars_in(offset, length)?, 0) {
            let line_break_offset = offset + delimiter.offset + delimiter.length;
            let line_offset = self.tree.offset_at(line);
            let length_after_insertion =
                line_offset + self.tree.total_length_at(line) - (offset + last_delimiter_end);
            line = self.set_line_length(line, line_break_offset - line_offset);
            let new_line = self.insert_line_after(line, length_after_insertion);
            line = self.set_line_length(new_line, length_after_insertion);
            last_delimiter_end = delimiter.offset + delimiter.length;
        }
        if last_delimiter_end != length {
            let total = self.tree.total_length_at(line);
            self.set_line_length(line, total + length - last_delimiter_end);
        }
        Ok(())
    }

    /// `length` characters were removed from the buffer at `offset`.
    pub(crate) fn remove(&mut self, offset: usize, length: usize) -> DocumentResult<()> {
        if length == 0 {
            return Ok(());
        }
        let start = self.line_at(offset)?;
        let start_offset = self.tree.offset_at(start);
        let start_total = self.tree.total_length_at(start);
        if offset > start_offset + start_total - self.tree.delimiter_length_at(start) {
            // starting between \r and \n: drop the \n from this line first
            self.set_line_length(start, start_total - 1);
            if length > 1 {
                return self.remove(offset, length - 1);
            }
            // a lone \n may now follow the \r and has to join this line
            if let Some(next) = self.tree.next_at(start) {
                let total = self.tree.total_length_at(next);
                self.set_line_length(next, total);
            }
            return Ok(());
        }
        if offset + length < start_offset + start_total {
            self.set_line_length(start, start_total - length);
            return Ok(());
        }

        // the start line lost its delimiter and merges with the end line
        let removed_in_start = start_offset + start_total - offset;
        let end = self.line_at(offset + length)?;
        if end == start {
            // removal up to the end of the last line
            self.set_line_length(start, start_total - length);
            return Ok(());
        }
        let end_offset = self.tree.offset_at(end);
        let left_in_end = end_offset + self.tree.total_length_at(end) - (offset + length);

        let mut next = self.tree.next_at(start);
        while let Some(line) = next {
            next = self.tree.next_at(line);
            self.remove_line(line);
            if line == end {
                break;
            }
        }
        let total = self.tree.total_length_at(start);
        self.set_line_length(start, total - removed_in_start + left_in_end);
        Ok(())
    }

    /// Rebuilds the tree from the whole buffer in one pass.
    pub(crate) fn rebuild(&mut self) {
        let mut lines = Vec::new();
        let mut last_delimiter_end = 0;
        for delimiter in NewLineIter::new(self.buffer.rope().chars(), 0) {
            let end = delimiter.offset + delimiter.length;
            lines.push(LineLengths::new(end - last_delimiter_end, delimiter.length));
            last_delimiter_end = end;
        }
        lines.push(LineLengths::new(self.buffer.len_chars() - last_delimiter_end, 0));

        self.tree.rebuild_tree(&lines);
        tracing::debug!(lines = lines.len(), "rebuilt line tree");
        for tracker in self.trackers {
            tracker.borrow_mut().rebuild_document();
        }
    }

    /// Tells every tracker the edit is finished.
    pub(crate) fn change_complete(&self, change: &DocumentChangeEventArgs) {
        for tracker in self.trackers {
            tracker.borrow_mut().change_complete(change);
        }
    }

    fn line_at(&self, offset: usize) -> DocumentResult<usize> {
        self.tree.index_by_offset(offset).ok_or_else(|| {
            BufferError::OffsetOutOfRange {
                offset,
                text_length: self.tree.text_length(),
            }
            .into()
        })
    }

    fn char_at(&self, offset: usize) -> Option<char> {
        self.buffer.rope().get_char(offset)
    }

    fn insert_line_after(&mut self, line: usize, total_length: usize) -> usize {
        let new_line = self.tree.insert_line_after_index(line, total_length);
        let tree: &LineTree = self.tree;
        for tracker in self.trackers {
            tracker
                .borrow_mut()
                .line_inserted(DocumentLine::new(tree, line), DocumentLine::new(tree, new_line));
        }
        new_line
    }

    fn remove_line(&mut self, line: usize) {
        let tree: &LineTree = self.tree;
        for tracker in self.trackers {
            tracker.borrow_mut().before_remove_line(DocumentLine::new(tree, line));
        }
        self.tree.remove_line_at(line);
    }

    // Sets the total length and recomputes the delimiter from the buffer.
    // Returns the line that now ends where `line` should end: normally
    // `line` itself, but the previous line when `line` was only the `\n` of
    // a `\r\n` pair and got merged into it.
    fn set_line_length(&mut self, line: usize, new_total_length: usize) -> usize {
        if new_total_length != self.tree.total_length_at(line) {
            let tree: &LineTree = self.tree;
            for tracker in self.trackers {
                tracker
                    .borrow_mut()
                    .set_line_length(DocumentLine::new(tree, line), new_total_length);
            }
            self.tree.set_total_length(line, new_total_length);
        }

        if new_total_length == 0 {
            self.tree.set_delimiter_length(line, 0);
            return line;
        }
        let line_offset = self.tree.offset_at(line);
        let delimiter_length = match self.char_at(line_offset + new_total_length - 1) {
            Some('\r') => 1,
            Some('\n') if new_total_length >= 2 && self.char_at(line_offset + new_total_length - 2) == Some('\r') => 2,
            Some('\n') if new_total_length == 1 && line_offset > 0 && self.char_at(line_offset - 1) == Some('\r') => {
                match self.tree.previous_at(line) {
                    Some(previous) => {
                        debug_assert_eq!(
                            self.tree.delimiter_length_at(previous),
                            1,
                            "line before a lone \\n must end with \\r"
                        );
                        self.remove_line(line);
                        let total = self.tree.total_length_at(previous);
                        return self.set_line_length(previous, total + 1);
                    }
                    None => 1,
                }
            }
            Some('\n') => 1,
            _ => 0,
        };
        self.tree.set_delimiter_length(line, delimiter_length);
        line
    }
}
