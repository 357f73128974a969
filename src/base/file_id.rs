//! Interned source-file handles.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A handle to one source file interned in a [`FileSet`](super::FileSet).
///
/// Ids are dense indices handed out in interning order. Locations carry a
/// `FileId` rather than a path, so merge bookkeeping and anonymous-segment
/// keying never touch the filesystem, and snapshots persist the raw index.
/// An id is only meaningful against the set that issued it; after a
/// restore the host must supply the matching path table.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub u32);

impl FileId {
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// The raw interning index.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::base::{FileSet, SourceLocation};

    #[test]
    fn test_ids_key_locations_per_file() {
        let files = FileSet::new();
        let header = files.file_id(Path::new("include/Widget.hpp"));
        let source = files.file_id(Path::new("src/Widget.cpp"));

        // Same line and column in two files are distinct locations.
        let decl = SourceLocation::new(header, 12, 3);
        let def = SourceLocation::new(source, 12, 3);
        assert_ne!(decl, def);

        // Re-interning the path reproduces the id, and with it the key.
        let again = files.file_id(Path::new("include/Widget.hpp"));
        assert_eq!(decl, SourceLocation::new(again, 12, 3));
    }

    #[test]
    fn test_snapshots_carry_the_raw_index() {
        let id = FileId::new(3);
        assert_eq!(serde_json::to_string(&id).unwrap(), "3");
        let back: FileId = serde_json::from_str("3").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_display_names_the_handle() {
        assert_eq!(FileId::new(7).to_string(), "file#7");
        assert_eq!(format!("{:?}", FileId::new(7)), "FileId(7)");
    }
}
