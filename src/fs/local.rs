//! Local disk backend

use super::{FileStatus, FileSystem};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

/// [`FileSystem`] backed by `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        path.try_exists()
    }

    fn list_status(&self, path: &Path) -> io::Result<Vec<FileStatus>> {
        let meta = fs::metadata(path)?;
        if !meta.is_dir() {
            return Ok(vec![FileStatus::file(path, meta.len())]);
        }

        let mut statuses = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let child = entry.path();
            // Follow symlinks so linked input trees are sized like real ones
            let meta = match fs::metadata(&child) {
                Ok(meta) => meta,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    // Dangling symlink, or removed since read_dir returned it
                    debug!(path = %child.display(), "Skipping entry without a target");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if meta.is_dir() {
                statuses.push(FileStatus::directory(child));
            } else {
                statuses.push(FileStatus::file(child, meta.len()));
            }
        }
        Ok(statuses)
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(File::open(path)?))
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + '_>> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Box::new(BufWriter::new(File::create(path)?)))
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn delete_recursive(&self, path: &Path) -> io::Result<bool> {
        match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(path).map(|_| true),
            Ok(_) => fs::remove_file(path).map(|_| true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}
