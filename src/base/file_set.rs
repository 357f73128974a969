//! File set management for tracking source files.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::FileId;

/// Manages the mapping between file paths and FileIds.
///
/// This is the "file database" that assigns stable IDs to paths. The parser
/// front-end registers every file it touches here before emitting locations
/// that reference it; a snapshot's `FileId`s are only meaningful against the
/// `FileSet` that produced them.
#[derive(Debug, Default)]
pub struct FileSet {
    inner: RwLock<FileSetInner>,
}

#[derive(Debug, Default)]
struct FileSetInner {
    /// Path → FileId mapping
    path_to_id: IndexMap<PathBuf, FileId>,
    /// FileId → Path mapping (reverse lookup)
    id_to_path: IndexMap<FileId, PathBuf>,
    /// Next FileId to assign
    next_id: u32,
}

impl FileSet {
    /// Create a new empty file set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a FileId for a path.
    ///
    /// If the path already has a FileId, returns it.
    /// Otherwise, assigns a new FileId.
    pub fn file_id(&self, path: &Path) -> FileId {
        // Fast path: read lock
        {
            let inner = self.inner.read();
            if let Some(&id) = inner.path_to_id.get(path) {
                return id;
            }
        }

        // Slow path: write lock
        let mut inner = self.inner.write();

        // Double-check
        if let Some(&id) = inner.path_to_id.get(path) {
            return id;
        }

        let id = FileId::new(inner.next_id);
        inner.next_id += 1;
        inner.path_to_id.insert(path.to_owned(), id);
        inner.id_to_path.insert(id, path.to_owned());
        id
    }

    /// Look up the path for a FileId.
    ///
    /// Returns `None` if the FileId was not assigned by this set.
    pub fn path(&self, id: FileId) -> Option<PathBuf> {
        self.inner.read().id_to_path.get(&id).cloned()
    }

    /// Look up the FileId for a path without assigning one.
    pub fn lookup(&self, path: &Path) -> Option<FileId> {
        self.inner.read().path_to_id.get(path).copied()
    }

    /// Number of registered files.
    pub fn len(&self) -> usize {
        self.inner.read().path_to_id.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All registered (id, path) pairs, in registration order.
    pub fn entries(&self) -> Vec<(FileId, PathBuf)> {
        self.inner
            .read()
            .id_to_path
            .iter()
            .map(|(&id, path)| (id, path.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_id_stable() {
        let set = FileSet::new();

        let a = set.file_id(Path::new("src/Widget.hpp"));
        let b = set.file_id(Path::new("src/Widget.cpp"));
        let a2 = set.file_id(Path::new("src/Widget.hpp"));

        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_reverse_lookup() {
        let set = FileSet::new();

        let id = set.file_id(Path::new("include/Game.hpp"));
        assert_eq!(set.path(id), Some(PathBuf::from("include/Game.hpp")));
        assert_eq!(set.path(FileId::new(99)), None);
    }

    #[test]
    fn test_lookup_does_not_assign() {
        let set = FileSet::new();

        assert_eq!(set.lookup(Path::new("a.hpp")), None);
        assert!(set.is_empty());
    }
}
