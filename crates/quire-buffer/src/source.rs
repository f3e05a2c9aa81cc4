//! Read-only text sources.
//!
//! `TextSource` is the read surface shared by the live buffer, the document
//! and the immutable snapshots handed out in change events. Search and range
//! helpers are default methods, so an implementation only has to provide
//! length, indexing and a char iterator.

use std::fmt;
use std::sync::Arc;

use memchr::memmem;
use ropey::Rope;

use crate::segment::Segment;
use crate::version::Version;
use crate::{BufferError, BufferResult};

/// An immutable text source that can be shared across threads.
pub type SharedText = Arc<dyn TextSource + Send + Sync>;

/// How substrings are compared when searching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringComparison {
    /// Exact char-by-char comparison
    #[default]
    Ordinal,
    /// Char-by-char comparison after simple lowercasing
    OrdinalIgnoreCase,
}

impl StringComparison {
    fn chars_equal(self, a: char, b: char) -> bool {
        match self {
            StringComparison::Ordinal => a == b,
            StringComparison::OrdinalIgnoreCase => a == b || a.to_lowercase().eq(b.to_lowercase()),
        }
    }
}

/// Streaming Knuth-Morris-Pratt search over `chars` for a non-empty
/// pattern. Returns the index of the first match, or of the last one when
/// `last` is set. Matches may overlap.
fn search_chars(
    chars: impl Iterator<Item = char>,
    pattern: &str,
    comparison: StringComparison,
    last: bool,
) -> Option<usize> {
    let pattern: Vec<char> = pattern.chars().collect();
    let m = pattern.len();
    // border[i]: length of the longest proper border of pattern[..=i]
    let mut border = vec![0; m];
    let mut k = 0;
    for i in 1..m {
        while k > 0 && !comparison.chars_equal(pattern[i], pattern[k]) {
            k = border[k - 1];
        }
        if comparison.chars_equal(pattern[i], pattern[k]) {
            k += 1;
        }
        border[i] = k;
    }

    let mut found = None;
    let mut matched = 0;
    for (i, ch) in chars.enumerate() {
        while matched > 0 && !comparison.chars_equal(ch, pattern[matched]) {
            matched = border[matched - 1];
        }
        if comparison.chars_equal(ch, pattern[matched]) {
            matched += 1;
        }
        if matched == m {
            found = Some(i + 1 - m);
            if !last {
                break;
            }
            matched = border[m - 1];
        }
    }
    found
}

/// Ordinal search for a non-empty pattern on the UTF-8 bytes of the rope
/// chunks. Only the last `pattern.len() - 1` bytes are carried from one
/// chunk to the next, so a match may straddle any number of chunks.
fn rope_search_bytes(rope: &Rope, pattern: &str, start: usize, count: usize, last: bool) -> Option<usize> {
    let needle = pattern.as_bytes();
    let keep = needle.len() - 1;
    let slice = rope.slice(start..start + count);
    let base = rope.char_to_byte(start);
    let mut window: Vec<u8> = Vec::new();

    if last {
        let finder = memmem::FinderRev::new(needle);
        let mut carry: Vec<u8> = Vec::new();
        let (mut chunks, ..) = slice.chunks_at_byte(slice.len_bytes());
        let mut chunk_start = slice.len_bytes();
        while let Some(chunk) = chunks.prev() {
            chunk_start -= chunk.len();
            // the chunk followed by the first bytes after it
            window.clear();
            window.extend_from_slice(chunk.as_bytes());
            window.extend_from_slice(&carry);
            if let Some(position) = finder.rfind(&window) {
                return Some(rope.byte_to_char(base + chunk_start + position));
            }
            carry.clear();
            carry.extend_from_slice(&window[..keep.min(window.len())]);
        }
    } else {
        let finder = memmem::Finder::new(needle);
        let mut window_start = 0;
        for chunk in slice.chunks() {
            window.extend_from_slice(chunk.as_bytes());
            if let Some(position) = finder.find(&window) {
                return Some(rope.byte_to_char(base + window_start + position));
            }
            let consumed = window.len().saturating_sub(keep);
            window.drain(..consumed);
            window_start += consumed;
        }
    }
    None
}

/// Substring search in a window of a rope. Ordinal searches run on the
/// chunk bytes, case-insensitive ones on the chars.
pub(crate) fn rope_index_of_str(
    rope: &Rope,
    pattern: &str,
    start: usize,
    count: usize,
    comparison: StringComparison,
    last: bool,
) -> BufferResult<Option<usize>> {
    validate_range(rope.len_chars(), start, count)?;
    if pattern.is_empty() {
        return Ok(Some(if last { start + count } else { start }));
    }
    let found = match comparison {
        StringComparison::Ordinal => rope_search_bytes(rope, pattern, start, count, last),
        StringComparison::OrdinalIgnoreCase => {
            search_chars(rope.chars_at(start).take(count), pattern, comparison, last).map(|i| start + i)
        }
    };
    Ok(found)
}

pub(crate) fn validate_range(text_length: usize, offset: usize, length: usize) -> BufferResult<()> {
    match offset.checked_add(length) {
        Some(end) if end <= text_length => Ok(()),
        _ => Err(BufferError::RangeOutOfRange {
            offset,
            length,
            text_length,
        }),
    }
}

pub(crate) fn rope_last_index_of_char(rope: &Rope, c: char, start: usize, count: usize) -> Option<usize> {
    let mut chars = rope.chars_at(start + count);
    for index in (start..start + count).rev() {
        match chars.prev() {
            Some(ch) if ch == c => return Some(index),
            Some(_) => {}
            None => break,
        }
    }
    None
}

/// Read access to a sequence of characters.
///
/// Search windows are `(start, count)` pairs: only matches lying completely
/// inside `start..start + count` are reported. A window outside the text is
/// an error, a missing match is `Ok(None)`.
pub trait TextSource: fmt::Debug {
    /// Number of characters.
    fn text_length(&self) -> usize;

    /// The character at `offset`.
    fn char_at(&self, offset: usize) -> BufferResult<char>;

    /// The complete text.
    fn text(&self) -> String;

    /// `length` characters starting at `offset`.
    fn text_range(&self, offset: usize, length: usize) -> BufferResult<String>;

    /// Iterates `count` characters starting at `offset`.
    fn chars_in(&self, offset: usize, count: usize) -> BufferResult<Box<dyn Iterator<Item = char> + '_>>;

    /// The version this text corresponds to, if it is tracked.
    fn version(&self) -> Option<Version> {
        None
    }

    /// Returns an immutable copy of this source.
    fn create_snapshot(&self) -> SharedText;

    /// The rope behind this source, for sources that have one. Lets a
    /// buffer insert the text by sharing chunks instead of copying.
    fn as_rope(&self) -> Option<&Rope> {
        None
    }

    /// The text covered by a segment.
    fn text_segment(&self, segment: &dyn Segment) -> BufferResult<String> {
        self.text_range(segment.offset(), segment.length())
    }

    /// First occurrence of `c` in the window.
    fn index_of_char(&self, c: char, start: usize, count: usize) -> BufferResult<Option<usize>> {
        Ok(self
            .chars_in(start, count)?
            .position(|ch| ch == c)
            .map(|i| start + i))
    }

    /// First occurrence of any of `chars` in the window.
    fn index_of_any(&self, chars: &[char], start: usize, count: usize) -> BufferResult<Option<usize>> {
        Ok(self
            .chars_in(start, count)?
            .position(|ch| chars.contains(&ch))
            .map(|i| start + i))
    }

    /// Last occurrence of `c` in the window.
    fn last_index_of_char(&self, c: char, start: usize, count: usize) -> BufferResult<Option<usize>> {
        Ok(self
            .chars_in(start, count)?
            .enumerate()
            .filter(|&(_, ch)| ch == c)
            .last()
            .map(|(i, _)| start + i))
    }

    /// First occurrence of `pattern` in the window. An empty pattern matches
    /// at `start`.
    fn index_of_str(
        &self,
        pattern: &str,
        start: usize,
        count: usize,
        comparison: StringComparison,
    ) -> BufferResult<Option<usize>> {
        let chars = self.chars_in(start, count)?;
        if pattern.is_empty() {
            return Ok(Some(start));
        }
        Ok(search_chars(chars, pattern, comparison, false).map(|i| start + i))
    }

    /// Last occurrence of `pattern` in the window. An empty pattern matches
    /// at the window end.
    fn last_index_of_str(
        &self,
        pattern: &str,
        start: usize,
        count: usize,
        comparison: StringComparison,
    ) -> BufferResult<Option<usize>> {
        let chars = self.chars_in(start, count)?;
        if pattern.is_empty() {
            return Ok(Some(start + count));
        }
        Ok(search_chars(chars, pattern, comparison, true).map(|i| start + i))
    }
}

/// A small immutable text held as a string.
///
/// Used for inserted text and short removed ranges, where copying the
/// characters is cheaper than sharing rope chunks.
#[derive(Clone, PartialEq, Eq)]
pub struct StringTextSource {
    text: Arc<str>,
    char_len: usize,
}

impl StringTextSource {
    /// Wraps a string.
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        let text = text.into();
        let char_len = text.chars().count();
        Self { text, char_len }
    }

    /// The empty text.
    pub fn empty() -> Self {
        Self::new("")
    }

    /// Wraps a string as a `SharedText`.
    pub fn shared(text: impl Into<Arc<str>>) -> SharedText {
        Arc::new(Self::new(text))
    }

    /// Borrows the text.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Debug for StringTextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StringTextSource").field(&self.text).finish()
    }
}

impl TextSource for StringTextSource {
    fn text_length(&self) -> usize {
        self.char_len
    }

    fn char_at(&self, offset: usize) -> BufferResult<char> {
        self.text.chars().nth(offset).ok_or(BufferError::OffsetOutOfRange {
            offset,
            text_length: self.char_len,
        })
    }

    fn text(&self) -> String {
        self.text.to_string()
    }

    fn text_range(&self, offset: usize, length: usize) -> BufferResult<String> {
        validate_range(self.char_len, offset, length)?;
        Ok(self.text.chars().skip(offset).take(length).collect())
    }

    fn chars_in(&self, offset: usize, count: usize) -> BufferResult<Box<dyn Iterator<Item = char> + '_>> {
        validate_range(self.char_len, offset, count)?;
        Ok(Box::new(self.text.chars().skip(offset).take(count)))
    }

    fn create_snapshot(&self) -> SharedText {
        Arc::new(self.clone())
    }
}

/// An immutable rope, optionally tagged with the version it was taken at.
#[derive(Debug, Clone)]
pub struct RopeTextSource {
    rope: Rope,
    version: Option<Version>,
}

impl RopeTextSource {
    /// Wraps a rope without version information.
    pub fn new(rope: Rope) -> Self {
        Self {
            rope,
            version: None,
        }
    }

    /// Wraps a rope taken at `version`.
    pub fn with_version(rope: Rope, version: Version) -> Self {
        Self {
            rope,
            version: Some(version),
        }
    }

    /// Borrows the rope.
    pub fn rope(&self) -> &Rope {
        &self.rope
    }
}

impl TextSource for RopeTextSource {
    fn text_length(&self) -> usize {
        self.rope.len_chars()
    }

    fn char_at(&self, offset: usize) -> BufferResult<char> {
        if offset >= self.rope.len_chars() {
            return Err(BufferError::OffsetOutOfRange {
                offset,
                text_length: self.rope.len_chars(),
            });
        }
        Ok(self.rope.char(offset))
    }

    fn text(&self) -> String {
        self.rope.to_string()
    }

    fn text_range(&self, offset: usize, length: usize) -> BufferResult<String> {
        validate_range(self.rope.len_chars(), offset, length)?;
        Ok(self.rope.slice(offset..offset + length).to_string())
    }

    fn chars_in(&self, offset: usize, count: usize) -> BufferResult<Box<dyn Iterator<Item = char> + '_>> {
        validate_range(self.rope.len_chars(), offset, count)?;
        Ok(Box::new(self.rope.chars_at(offset).take(count)))
    }

    fn last_index_of_char(&self, c: char, start: usize, count: usize) -> BufferResult<Option<usize>> {
        validate_range(self.rope.len_chars(), start, count)?;
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

    fn version(&self) -> Option<Version> {
        self.version.clone()
    }

    fn create_snapshot(&self) -> SharedText {
        Arc::new(self.clone())
    }

    fn as_rope(&self) -> Option<&Rope> {
        Some(&self.rope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimpleSegment;

    #[test]
    fn test_string_source_counts_chars() {
        let source = StringTextSource::new("añb");
        assert_eq!(source.text_length(), 3);
        assert_eq!(source.char_at(1).unwrap(), 'ñ');
        assert_eq!(source.text_range(1, 2).unwrap(), "ñb");
        assert!(source.text_range(2, 2).is_err());
        assert!(source.char_at(3).is_err());
    }

    #[test]
    fn test_segment_access() {
        let source = RopeTextSource::new(Rope::from_str("hello world"));
        let segment = SimpleSegment::new(6, 5);
        assert_eq!(source.text_segment(&segment).unwrap(), "world");
    }

    #[test]
    fn test_index_of_any() {
        let source = StringTextSource::new("key = value; other");
        assert_eq!(source.index_of_any(&['=', ';'], 0, 18).unwrap(), Some(4));
        assert_eq!(source.index_of_any(&['=', ';'], 5, 13).unwrap(), Some(11));
        assert_eq!(source.index_of_any(&['#'], 0, 18).unwrap(), None);
    }

    #[test]
    fn test_string_search_edges() {
        let source = StringTextSource::new("aaa");
        assert_eq!(
            source.index_of_str("", 1, 2, StringComparison::Ordinal).unwrap(),
            Some(1)
        );
        assert_eq!(
            source.last_index_of_str("", 1, 2, StringComparison::Ordinal).unwrap(),
            Some(3)
        );
        assert_eq!(
            source.index_of_str("aaaa", 0, 3, StringComparison::Ordinal).unwrap(),
            None
        );
        assert_eq!(
            source.last_index_of_str("aa", 0, 3, StringComparison::Ordinal).unwrap(),
            Some(1)
        );
        assert!(source.index_of_char('a', 2, 2).is_err());
    }

    #[test]
    fn test_rope_reverse_search() {
        let source = RopeTextSource::new(Rope::from_str("x.y.z"));
        assert_eq!(source.last_index_of_char('.', 0, 5).unwrap(), Some(3));
        assert_eq!(source.last_index_of_char('.', 0, 3).unwrap(), Some(1));
        assert_eq!(source.last_index_of_char('.', 4, 1).unwrap(), None);
    }

    #[test]
    fn test_search_across_rope_chunks() {
        // long enough for the rope to hold many chunks
        let mut text = "ab".repeat(3000);
        text.push_str("needle");
        text.push_str(&"é".repeat(2000));
        text.push_str("needle");
        text.push_str(&"ab".repeat(3000));
        let length = text.chars().count();
        let rope = RopeTextSource::new(Rope::from_str(&text));
        let string = StringTextSource::new(text.as_str());
        assert!(rope.rope().chunks().count() > 2);

        for comparison in [StringComparison::Ordinal, StringComparison::OrdinalIgnoreCase] {
            for source in [&rope as &dyn TextSource, &string] {
                assert_eq!(source.index_of_str("needle", 0, length, comparison).unwrap(), Some(6000));
                assert_eq!(
                    source.last_index_of_str("needle", 0, length, comparison).unwrap(),
                    Some(8006)
                );
                assert_eq!(source.index_of_str("needle", 6001, 2005, comparison).unwrap(), None);
                assert_eq!(source.last_index_of_str("éne", 0, length, comparison).unwrap(), Some(8005));
                assert_eq!(source.index_of_str("bab", 1, 10, comparison).unwrap(), Some(1));
            }
        }
        assert_eq!(
            rope.index_of_str("NEEDLE", 0, length, StringComparison::OrdinalIgnoreCase)
                .unwrap(),
            Some(6000)
        );
        assert_eq!(
            rope.index_of_str("NEEDLE", 0, length, StringComparison::Ordinal).unwrap(),
            None
        );
    }

    #[test]
    fn test_snapshot_keeps_version() {
        let provider = crate::VersionProvider::new();
        let source = RopeTextSource::with_version(Rope::from_str("v"), provider.current_version());
        let snapshot = source.create_snapshot();
        let version = snapshot.version().unwrap();
        assert_eq!(version.compare_age(&provider.current_version()).unwrap(), std::cmp::Ordering::Equal);
    }
}
