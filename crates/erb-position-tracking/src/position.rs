//! Line/column positions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A line/column pair in source text.
///
/// Lines are 1-based and columns are 0-based byte columns, matching the
/// positions printed by the token dump (`start=(1:0)`). Positions order
/// by line first, then column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Line number (1-based)
    pub line: usize,
    /// Column number (0-based, in bytes)
    pub column: usize,
}

impl Position {
    /// Create a position.
    pub fn new(line: usize, column: usize) -> Self {
        Position { line, column }
    }

    /// The position at the start of any input.
    pub fn start() -> Self {
        Position { line: 1, column: 0 }
    }

    /// Advance past a single character.
    pub fn advance(&mut self, ch: char) {
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += ch.len_utf8();
        }
    }

    /// Advance past a string slice.
    pub fn advance_str(&mut self, text: &str) {
        for ch in text.chars() {
            self.advance(ch);
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::start()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}:{})", self.line, self.column)
    }
}
