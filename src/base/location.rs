//! Source positions for declarations and definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::FileId;

/// A file + line + column position in source text.
///
/// Line and column are 1-indexed, exactly as delivered by the parser
/// front-end. Locations are used for merge bookkeeping (tracking where a
/// symbol was declared and defined) and to key anonymous entities, never
/// for text manipulation.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceLocation {
    /// The file containing this location.
    pub file: FileId,
    /// 1-indexed line number.
    pub line: u32,
    /// 1-indexed column number.
    pub column: u32,
}

impl SourceLocation {
    /// Create a new location.
    #[inline]
    pub const fn new(file: FileId, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }
}

impl fmt::Debug for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : L{}.C{}", self.file, self.line, self.column)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : L{}.C{}", self.file, self.line, self.column)
    }
}
