//! Resolved source location of an XML node

use std::fmt;
use std::hash::{Hash, Hasher};

/// The location of an XML node in a source file: a text range on a
/// single line, 1-based, plus an optional system id naming the source
/// document (typically a file path).
///
/// A position can be [undefined](Position::is_undefined), meaning no
/// reliable location could be recovered; line and column are then `-1`
/// and must not be interpreted.
///
/// Two positions are equal when their line and column are equal; the
/// range length and the system id do not take part in the comparison.
#[derive(Debug, Clone)]
pub struct Position {
    system_id: Option<String>,
    line: i32,
    column: i32,
    length: usize,
}

impl Position {
    /// The undefined position, with no system id.
    pub const UNDEFINED: Position = Position {
        system_id: None,
        line: -1,
        column: -1,
        length: 0,
    };

    /// A position at the given 1-based line and column.
    pub fn new(system_id: Option<String>, line: u32, column: u32) -> Self {
        Position::with_length(system_id, line, column, 0)
    }

    /// A position at the given 1-based line and column, spanning
    /// `length` bytes on that line.
    pub fn with_length(system_id: Option<String>, line: u32, column: u32, length: usize) -> Self {
        Position {
            system_id,
            line: line as i32,
            column: column as i32,
            length,
        }
    }

    /// An undefined position in the document identified by `system_id`.
    pub fn undefined_in(system_id: Option<String>) -> Self {
        Position {
            system_id,
            line: -1,
            column: -1,
            length: 0,
        }
    }

    /// The 1-based line number. Garbage if this position is undefined.
    pub fn line(&self) -> i32 {
        self.line
    }

    /// The 1-based column number of the start of the range. Garbage if
    /// this position is undefined.
    pub fn column(&self) -> i32 {
        self.column
    }

    /// Length of the text range in bytes.
    pub fn length(&self) -> usize {
        self.length
    }

    /// The system id of the document this position belongs to.
    pub fn system_id(&self) -> Option<&str> {
        self.system_id.as_deref()
    }

    /// If true, line and column numbers are unreliable.
    pub fn is_undefined(&self) -> bool {
        self.line < 0 || self.column < 0
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.line == other.line && self.column == other.column
    }
}

impl Eq for Position {}

impl Hash for Position {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.line.hash(state);
        self.column.hash(state);
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(id) = &self.system_id {
            write!(f, "in {id}: ")?;
        }
        if self.is_undefined() {
            write!(f, "unknown position")
        } else {
            write!(f, "line {}, column {}", self.line, self.column)
        }
    }
}
