//! In-memory backend
//!
//! Children are listed in the order they were created. Checksum ordering
//! depends on listing order for ties, so this backend is what the tests use
//! to pin that order down.

use super::{FileStatus, FileSystem};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
enum MemNode {
    Dir,
    File(Vec<u8>),
}

/// [`FileSystem`] kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    /// Entries in creation order
    entries: RwLock<Vec<(PathBuf, MemNode)>>,

    /// Paths whose reads fail after open
    failing_reads: RwLock<HashSet<PathBuf>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file with the given contents, creating parent directories
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.ensure_dirs(parent);
        }
        self.put_file(path, contents.into());
    }

    /// Add an empty directory (and its parents)
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        self.ensure_dirs(path.as_ref());
    }

    /// Read back a file's contents
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let entries = self.entries.read();
        entries.iter().find_map(|(p, node)| match node {
            MemNode::File(data) if p == path.as_ref() => Some(data.clone()),
            _ => None,
        })
    }

    /// Make every read of `path` fail with an I/O error
    pub fn fail_reads(&self, path: impl Into<PathBuf>) {
        self.failing_reads.write().insert(path.into());
    }

    /// Number of entries (files and directories) in the tree
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn is_root(path: &Path) -> bool {
        path.as_os_str().is_empty() || path == Path::new("/")
    }

    fn ensure_dirs(&self, path: &Path) {
        let mut entries = self.entries.write();
        let mut missing: Vec<&Path> = path
            .ancestors()
            .filter(|p| !Self::is_root(p))
            .filter(|p| !entries.iter().any(|(e, _)| e == p))
            .collect();
        missing.reverse();
        for dir in missing {
            entries.push((dir.to_path_buf(), MemNode::Dir));
        }
    }

    fn put_file(&self, path: &Path, data: Vec<u8>) {
        let mut entries = self.entries.write();
        match entries.iter_mut().find(|(p, _)| p == path) {
            Some((_, node)) => *node = MemNode::File(data),
            None => entries.push((path.to_path_buf(), MemNode::File(data))),
        }
    }

    fn node(&self, path: &Path) -> Option<MemNode> {
        self.entries
            .read()
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, node)| node.clone())
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        Ok(Self::is_root(path) || self.node(path).is_some())
    }

    fn list_status(&self, path: &Path) -> io::Result<Vec<FileStatus>> {
        match self.node(path) {
            Some(MemNode::File(data)) => {
                return Ok(vec![FileStatus::file(path, data.len() as u64)])
            }
            Some(MemNode::Dir) => {}
            None if Self::is_root(path) => {}
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} does not exist", path.display()),
                ))
            }
        }

        let entries = self.entries.read();
        let children = entries
            .iter()
            .filter(|(p, _)| p.parent() == Some(path))
            .map(|(p, node)| match node {
                MemNode::Dir => FileStatus::directory(p),
                MemNode::File(data) => FileStatus::file(p, data.len() as u64),
            })
            .collect();
        Ok(children)
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + '_>> {
        match self.node(path) {
            Some(MemNode::File(data)) => {
                if self.failing_reads.read().contains(path) {
                    Ok(Box::new(FailingReader))
                } else {
                    Ok(Box::new(Cursor::new(data)))
                }
            }
            Some(MemNode::Dir) => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{} is a directory", path.display()),
            )),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )),
        }
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + '_>> {
        if let Some(MemNode::Dir) = self.node(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} is a directory", path.display()),
            ));
        }
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent)?;
        }
        self.put_file(path, Vec::new());
        Ok(Box::new(MemoryWriter {
            fs: self,
            path: path.to_path_buf(),
            buf: Vec::new(),
        }))
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let blocked = path
            .ancestors()
            .find(|p| matches!(self.node(p), Some(MemNode::File(_))));
        if let Some(file) = blocked {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} is a file", file.display()),
            ));
        }
        self.ensure_dirs(path);
        Ok(())
    }

    fn delete_recursive(&self, path: &Path) -> io::Result<bool> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(p, _)| !p.starts_with(path));
        Ok(entries.len() != before)
    }
}

/// Buffers writes and publishes them on flush and on drop
struct MemoryWriter<'a> {
    fs: &'a MemoryFileSystem,
    path: PathBuf,
    buf: Vec<u8>,
}

impl Write for MemoryWriter<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.fs.put_file(&self.path, self.buf.clone());
        Ok(())
    }
}

impl Drop for MemoryWriter<'_> {
    fn drop(&mut self) {
        self.fs.put_file(&self.path, std::mem::take(&mut self.buf));
    }
}

struct FailingReader;

impl Read for FailingReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "injected read failure"))
    }
}
