//! Source locations recovered from front-end metadata
//!
//! The backend never owns source text; it only sees the file/line/column
//! triples the front end resolved. A zero line means "no location".

/// Identifies a source file registered in a [`SourceMap`](crate::SourceMap).
pub type FileId = u32;

/// A position in a source file, as reported by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceLoc {
    /// Source file ID (index into the unit's `SourceMap`)
    pub file: FileId,
    /// Line (1-indexed; 0 = unknown)
    pub line: u32,
    /// Column (1-indexed; 0 = unknown)
    pub column: u32,
}

impl SourceLoc {
    /// The "no location" sentinel.
    pub const NONE: SourceLoc = SourceLoc { file: 0, line: 0, column: 0 };

    pub fn new(file: FileId, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }

    /// A location with a known line but no column.
    pub fn line_only(file: FileId, line: u32) -> Self {
        Self { file, line, column: 0 }
    }

    /// Whether this location carries any position information.
    pub fn is_known(&self) -> bool {
        self.line != 0
    }

    /// Prefers `self` when known, otherwise falls back to `other`.
    pub fn or(self, other: SourceLoc) -> SourceLoc {
        if self.is_known() {
            self
        } else {
            other
        }
    }
}

/// Trait for values that carry a source location.
pub trait Located {
    fn loc(&self) -> SourceLoc;
}
