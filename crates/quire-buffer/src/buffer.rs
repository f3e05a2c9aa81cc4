//! Character buffer backed by a rope.
//!
//! ## Why Rope?
//!
//! The document performs a remove + insert pair on every edit, including
//! huge pastes and whole-document replacements. A rope keeps both at
//! O(log n) and makes `clone()` an O(1) structural copy:
//! - **Snapshots**: unmodified chunks are shared, edits copy on write
//! - **Large removals**: a removed range can be kept as a rope slice
//!   without copying the characters
//!
//! ## Learning: Ownership in Action
//!
//! ```rust,ignore
//! let mut buffer = TextBuffer::from("abc");
//! let snapshot = buffer.snapshot();   // shares every chunk with `buffer`
//! buffer.insert_text(0, "x")?;        // copies only the touched path
//! assert_eq!(snapshot, "abc");        // the snapshot never changes
//! ```

use ropey::Rope;
use std::sync::Arc;

use crate::source::{
    RopeTextSource, SharedText, StringComparison, TextSource, rope_index_of_str, rope_last_index_of_char,
};
use crate::{BufferError, BufferResult};

/// An editable sequence of characters.
///
/// # Thread Safety
///
/// `TextBuffer` is `Send + Sync`, but mutation needs `&mut self`. Readers on
/// other threads should work on a `snapshot()` instead of sharing the buffer.
#[derive(Debug, Clone, Default)]
pub struct TextBuffer {
    /// The rope holding our text content
    rope: Rope,
}

impl TextBuffer {
    /// Creates a new empty buffer.
    ///
    /// # Example
    /// ```
    /// use quire_buffer::TextBuffer;
    ///
    /// let buffer = TextBuffer::new();
    /// assert!(buffer.is_empty());
    /// ```
    pub fn new() -> Self {
        Self { rope: Rope::new() }
    }

    /// Creates a buffer that shares the given rope.
    pub fn from_rope(rope: Rope) -> Self {
        Self { rope }
    }

    // ==================== Measurements ====================

    /// Returns the number of characters in the buffer.
    #[inline]
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Returns true if the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Borrows the underlying rope.
    #[inline]
    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    /// Returns an immutable copy of the current content in O(1).
    #[inline]
    pub fn snapshot(&self) -> Rope {
        self.rope.clone()
    }

    // ==================== Validation ====================

    /// Fails unless `offset` lies within `[0, len]`.
    pub fn check_offset(&self, offset: usize) -> BufferResult<()> {
        let text_length = self.len_chars();
        if offset > text_length {
            return Err(BufferError::OffsetOutOfRange {
                offset,
                text_length,
            });
        }
        Ok(())
    }

    /// Fails unless `offset..offset + length` lies within `[0, len]`.
    pub fn check_range(&self, offset: usize, length: usize) -> BufferResult<()> {
        let text_length = self.len_chars();
        match offset.checked_add(length) {
            Some(end) if end <= text_length => Ok(()),
            _ => Err(BufferError::RangeOutOfRange {
                offset,
                length,
                text_length,
            }),
        }
    }

    // ==================== Text Access ====================

    /// Returns a copy of a range as an owned rope. Chunks are shared with the
    /// buffer, so this is cheap even for large ranges.
    pub fn slice_rope(&self, offset: usize, length: usize) -> BufferResult<Rope> {
        self.check_range(offset, length)?;
        Ok(Rope::from(self.rope.slice(offset..offset + length)))
    }

    /// Returns the length of the content in UTF-16 code units.
    #[inline]
    pub fn len_utf16(&self) -> usize {
        self.rope.len_utf16_cu()
    }

    /// Converts a char offset to a UTF-16 code unit offset.
    pub fn char_to_utf16(&self, offset: usize) -> BufferResult<usize> {
        self.check_offset(offset)?;
        Ok(self.rope.char_to_utf16_cu(offset))
    }

    /// Converts a UTF-16 code unit offset to a char offset. An offset inside
    /// a surrogate pair maps to the char the pair encodes.
    pub fn utf16_to_char(&self, utf16_offset: usize) -> BufferResult<usize> {
        let utf16_length = self.rope.len_utf16_cu();
        if utf16_offset > utf16_length {
            return Err(BufferError::OffsetOutOfRange {
                offset: utf16_offset,
                text_length: utf16_length,
            });
        }
        Ok(self.rope.utf16_cu_to_char(utf16_offset))
    }

    // ==================== Mutations ====================

    /// Inserts text at a character offset.
    pub fn insert_text(&mut self, offset: usize, text: &str) -> BufferResult<()> {
        self.check_offset(offset)?;
        self.rope.insert(offset, text);
        tracing::trace!(offset, len = self.rope.len_chars(), "buffer insert");
        Ok(())
    }

    /// Inserts the content of another rope, sharing its chunks.
    pub fn insert_rope(&mut self, offset: usize, inserted: &Rope) -> BufferResult<()> {
        self.check_offset(offset)?;
        if inserted.len_chars() == 0 {
            return Ok(());
        }
        let tail = self.rope.split_off(offset);
        self.rope.append(inserted.clone());
        self.rope.append(tail);
        tracing::trace!(offset, inserted = inserted.len_chars(), "buffer insert rope");
        Ok(())
    }

    /// Removes `length` characters starting at `offset`.
    pub fn remove_range(&mut self, offset: usize, length: usize) -> BufferResult<()> {
        self.check_range(offset, length)?;
        if length > 0 {
            self.rope.remove(offset..offset + length);
            tracing::trace!(offset, length, "buffer remove");
        }
        Ok(())
    }

    /// Removes all text.
    pub fn clear(&mut self) {
        tracing::trace!(removed = self.rope.len_chars(), "buffer clear");
        self.rope = Rope::new();
    }
}

impl TextSource for TextBuffer {
    fn text_length(&self) -> usize {
        self.len_chars()
    }

    fn char_at(&self, offset: usize) -> BufferResult<char> {
        if offset >= self.len_chars() {
            return Err(BufferError::OffsetOutOfRange {
                offset,
                text_length: self.len_chars(),
            });
        }
        Ok(self.rope.char(offset))
    }

    fn text(&self) -> String {
        self.rope.to_string()
    }

    fn text_range(&self, offset: usize, length: usize) -> BufferResult<String> {
        self.check_range(offset, length)?;
        Ok(self.rope.slice(offset..offset + length).to_string())
    }

    fn chars_in(&self, offset: usize, count: usize) -> BufferResult<Box<dyn Iterator<Item = char> + '_>> {
        self.check_range(offset, count)?;
        Ok(Box::new(self.rope.chars_at(offset).take(count)))
    }

    fn last_index_of_char(&self, c: char, start: usize, count: usize) -> BufferResult<Option<usize>> {
        self.check_range(start, count)?;
        Ok(rope_last_index_of_char(&self.rope, c, start, count))
    }

    fn index_of_str(
        &self,
        pattern: &str,
        start: usize,
        count: usize,
        comparison: StringComparison,
    ) -> BufferResult<Option<usize>> {
        rope_index_of_str(&self.rope, pattern, start, count, comparison, false)
    }

    fn last_index_of_str(
        &self,
        pattern: &str,
        start: usize,
        count: usize,
        comparison: StringComparison,
    ) -> BufferResult<Option<usize>> {
        rope_index_of_str(&self.rope, pattern, start, count, comparison, true)
    }

    fn create_snapshot(&self) -> SharedText {
        Arc::new(RopeTextSource::new(self.snapshot()))
    }

    fn as_rope(&self) -> Option<&Rope> {
        Some(&self.rope)
    }
}

impl From<&str> for TextBuffer {
    fn from(s: &str) -> Self {
        Self {
            rope: Rope::from_str(s),
        }
    }
}

impl From<String> for TextBuffer {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<Rope> for TextBuffer {
    fn from(rope: Rope) -> Self {
        Self::from_rope(rope)
    }
}
