//! Newline detection.
//!
//! A line delimiter is `\r\n`, a lone `\r` or a lone `\n`. Scanning is a
//! single forward pass that peeks one character after every `\r` to tell
//! the two-character delimiter apart from the one-character one.

use serde::{Deserialize, Serialize};
use std::iter::Peekable;

use crate::segment::SimpleSegment;
use crate::source::TextSource;
use crate::BufferResult;

/// All recognized delimiter strings, longest first.
pub const NEWLINE_STRINGS: [&str; 3] = ["\r\n", "\n", "\r"];

/// Returns true for `\r` and `\n`.
#[inline]
pub fn is_newline(c: char) -> bool {
    c == '\r' || c == '\n'
}

/// Line delimiter style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewLine {
    /// Unix-style: \n
    #[default]
    Lf,
    /// Windows-style: \r\n
    CrLf,
    /// Classic Mac: \r
    Cr,
}

impl NewLine {
    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            NewLine::Lf => "\n",
            NewLine::CrLf => "\r\n",
            NewLine::Cr => "\r",
        }
    }

    /// Maps a delimiter string back to its style.
    pub fn from_delimiter(delimiter: &str) -> Option<Self> {
        match delimiter {
            "\n" => Some(NewLine::Lf),
            "\r\n" => Some(NewLine::CrLf),
            "\r" => Some(NewLine::Cr),
            _ => None,
        }
    }

    /// Detects the style of the first delimiter in `text`.
    pub fn detect(text: &str) -> Option<Self> {
        next_newline(text, 0).map(|seg| {
            if seg.length == 2 {
                NewLine::CrLf
            } else if text.chars().nth(seg.offset) == Some('\r') {
                NewLine::Cr
            } else {
                NewLine::Lf
            }
        })
    }
}

/// Iterator over the delimiter segments of a char sequence.
///
/// Offsets are relative to the first character fed in, plus the `base`
/// given at construction.
pub struct NewLineIter<I: Iterator<Item = char>> {
    chars: Peekable<I>,
    position: usize,
}

impl<I: Iterator<Item = char>> NewLineIter<I> {
    /// Scans `chars`, reporting offsets starting at `base`.
    pub fn new(chars: I, base: usize) -> Self {
        Self {
            chars: chars.peekable(),
            position: base,
        }
    }
}

impl<I: Iterator<Item = char>> Iterator for NewLineIter<I> {
    type Item = SimpleSegment;

    fn next(&mut self) -> Option<SimpleSegment> {
        while let Some(c) = self.chars.next() {
            let offset = self.position;
            self.position += 1;
            match c {
                '\r' => {
                    if self.chars.peek() == Some(&'\n') {
                        self.chars.next();
                        self.position += 1;
                        return Some(SimpleSegment::new(offset, 2));
                    }
                    return Some(SimpleSegment::new(offset, 1));
                }
                '\n' => return Some(SimpleSegment::new(offset, 1)),
                _ => {}
            }
        }
        None
    }
}

/// All delimiters in `text`, in order.
pub fn newlines(text: &str) -> NewLineIter<std::str::Chars<'_>> {
    NewLineIter::new(text.chars(), 0)
}

/// The first delimiter at or after char offset `offset`.
pub fn next_newline(text: &str, offset: usize) -> Option<SimpleSegment> {
    NewLineIter::new(text.chars().skip(offset), offset).next()
}

/// The first delimiter at or after `offset` in a text source.
pub fn next_newline_in_source(source: &dyn TextSource, offset: usize) -> BufferResult<Option<SimpleSegment>> {
    let count = source.text_length().saturating_sub(offset);
    Ok(NewLineIter::new(source.chars_in(offset, count)?, offset).next())
}

/// Replaces every delimiter in `text` with `newline`.
pub fn normalize_newlines(text: &str, newline: NewLine) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                result.push_str(newline.as_str());
            }
            '\n' => result.push_str(newline.as_str()),
            _ => result.push(c),
        }
    }
    result
}
