//! Line/column locations.
//!
//! ## Learning: Newtype Pattern
//!
//! `TextLocation` wraps line/column coordinates instead of a
//! `(usize, usize)` tuple so line and column can't be swapped by accident.
//!
//! Both coordinates are **1-based**. `TextLocation::EMPTY` (0, 0) marks
//! "no location".

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A position in a document given as line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextLocation {
    /// Line number (1-based)
    pub line: usize,
    /// Column (1-based, in characters)
    pub column: usize,
}

impl TextLocation {
    /// The "no location" value.
    pub const EMPTY: TextLocation = TextLocation { line: 0, column: 0 };

    /// Creates a new location.
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Returns true for `TextLocation::EMPTY`.
    pub fn is_empty(&self) -> bool {
        self.line == 0 && self.column == 0
    }
}

impl PartialOrd for TextLocation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TextLocation {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.line.cmp(&other.line) {
            Ordering::Equal => self.column.cmp(&other.column),
            other => other,
        }
    }
}

impl fmt::Display for TextLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(Line {}, Col {})", self.line, self.column)
    }
}
