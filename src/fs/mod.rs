//! Filesystem capability used by the builder
//!
//! The builder never touches `std::fs` directly. Everything it needs from
//! storage goes through the [`FileSystem`] trait so the same orchestration
//! and checksum code runs against a local disk or an in-memory tree.
//!
//! Two backends are provided:
//! - [`LocalFileSystem`]: thin wrapper over `std::fs`
//! - [`MemoryFileSystem`]: in-memory tree that lists children in creation
//!   order, which makes listing-order behavior testable

pub mod local;
pub mod memory;

pub use local::LocalFileSystem;
pub use memory::MemoryFileSystem;

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Status of a single filesystem entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    /// Full path of the entry
    pub path: PathBuf,

    /// Whether the entry is a directory
    pub is_dir: bool,

    /// Length in bytes (0 for directories)
    pub len: u64,
}

impl FileStatus {
    /// Create a status for a regular file
    pub fn file(path: impl Into<PathBuf>, len: u64) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
            len,
        }
    }

    /// Create a status for a directory
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_dir: true,
            len: 0,
        }
    }

    /// Final path component as a string ("" if it has none or is not UTF-8)
    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
    }

    /// Hidden entries start with a dot
    pub fn is_hidden(&self) -> bool {
        self.name().starts_with('.')
    }
}

/// Storage primitives needed to size input, clear temp space and checksum
/// the output.
pub trait FileSystem {
    /// Check whether a path exists
    fn exists(&self, path: &Path) -> io::Result<bool>;

    /// List a path.
    ///
    /// For a directory this returns its direct children in whatever order
    /// the backend provides. For a file it returns the file's own status.
    /// A missing path is an error of kind [`io::ErrorKind::NotFound`].
    fn list_status(&self, path: &Path) -> io::Result<Vec<FileStatus>>;

    /// Open a file for streaming reads
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + '_>>;

    /// Create (or truncate) a file, creating missing parent directories
    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + '_>>;

    /// Create a directory and all of its missing parents
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Recursively delete a path. Returns false if nothing was there.
    fn delete_recursive(&self, path: &Path) -> io::Result<bool>;
}

impl<F: FileSystem + ?Sized> FileSystem for &F {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        (**self).exists(path)
    }

    fn list_status(&self, path: &Path) -> io::Result<Vec<FileStatus>> {
        (**self).list_status(path)
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + '_>> {
        (**self).open(path)
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + '_>> {
        (**self).create(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        (**self).create_dir_all(path)
    }

    fn delete_recursive(&self, path: &Path) -> io::Result<bool> {
        (**self).delete_recursive(path)
    }
}

impl<F: FileSystem + ?Sized> FileSystem for std::sync::Arc<F> {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        (**self).exists(path)
    }

    fn list_status(&self, path: &Path) -> io::Result<Vec<FileStatus>> {
        (**self).list_status(path)
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + '_>> {
        (**self).open(path)
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + '_>> {
        (**self).create(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        (**self).create_dir_all(path)
    }

    fn delete_recursive(&self, path: &Path) -> io::Result<bool> {
        (**self).delete_recursive(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_status_name() {
        let status = FileStatus::file("/out/node-0/0.index", 12);
        assert_eq!(status.name(), "0.index");
        assert!(!status.is_hidden());
        assert!(!status.is_dir);

        let hidden = FileStatus::file("/out/node-0/.0.data.crc", 8);
        assert!(hidden.is_hidden());

        let dir = FileStatus::directory("/out/node-3");
        assert_eq!(dir.name(), "node-3");
        assert_eq!(dir.len, 0);
    }
}
