//! Input size scanner
//!
//! Sums file lengths under a path. Traversal is iterative with an explicit
//! stack of pending directories, so arbitrarily deep trees never grow the
//! call stack.

use crate::fs::FileSystem;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

/// Pending directory
#[derive(Debug, Clone)]
struct DirWork {
    path: PathBuf,
    depth: u32,
}

/// Totals from scanning a path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Directories visited (including the root, if it is one)
    pub dirs: u64,
    /// Files counted
    pub files: u64,
    /// Sum of file lengths
    pub bytes: u64,
    /// Deepest directory level reached (root = 0)
    pub max_depth: u32,
    pub duration: Duration,
}

/// Total size in bytes of everything under `path`.
///
/// Returns 0 for an empty directory and for a path that does not exist;
/// callers that care about the difference must check existence themselves.
pub fn size_of_path<F: FileSystem + ?Sized>(fs: &F, path: &Path) -> io::Result<u64> {
    scan_path(fs, path).map(|stats| stats.bytes)
}

/// Walk `path` and collect file/dir/byte totals
pub fn scan_path<F: FileSystem + ?Sized>(fs: &F, path: &Path) -> io::Result<ScanStats> {
    let start = Instant::now();
    let mut stats = ScanStats::default();
    let mut pending = vec![DirWork {
        path: path.to_path_buf(),
        depth: 0,
    }];

    while let Some(work) = pending.pop() {
        let statuses = match fs.list_status(&work.path) {
            Ok(statuses) => statuses,
            // An absent root sizes as empty; anything below it must list
            Err(e) if e.kind() == io::ErrorKind::NotFound && work.depth == 0 => {
                debug!(path = %work.path.display(), "Input path does not exist");
                continue;
            }
            Err(e) => return Err(e),
        };

        // Listing a file yields the file itself
        if let [single] = statuses.as_slice() {
            if !single.is_dir && single.path == work.path {
                stats.files += 1;
                stats.bytes += single.len;
                continue;
            }
        }

        stats.dirs += 1;
        stats.max_depth = stats.max_depth.max(work.depth);

        for status in statuses {
            if status.is_dir {
                pending.push(DirWork {
                    path: status.path,
                    depth: work.depth + 1,
                });
            } else {
                stats.files += 1;
                stats.bytes += status.len;
            }
        }
    }

    stats.duration = start.elapsed();
    debug!(
        path = %path.display(),
        dirs = stats.dirs,
        files = stats.files,
        bytes = stats.bytes,
        "Scanned input"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileStatus, LocalFileSystem, MemoryFileSystem};
    use tempfile::tempdir;

    #[test]
    fn test_nested_files() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/input/a.txt", vec![0u8; 10]);
        fs.add_file("/input/one/b.txt", vec![0u8; 20]);
        fs.add_file("/input/one/two/c.txt", vec![0u8; 30]);

        assert_eq!(size_of_path(&fs, Path::new("/input")).unwrap(), 60);

        let stats = scan_path(&fs, Path::new("/input")).unwrap();
        assert_eq!(stats.files, 3);
        assert_eq!(stats.dirs, 3);
        assert_eq!(stats.max_depth, 2);
    }

    #[test]
    fn test_empty_and_missing_are_zero() {
        let fs = MemoryFileSystem::new();
        fs.add_dir("/empty");

        assert_eq!(size_of_path(&fs, Path::new("/empty")).unwrap(), 0);
        assert_eq!(size_of_path(&fs, Path::new("/missing")).unwrap(), 0);
    }

    #[test]
    fn test_single_file_path() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/input/records.txt", vec![1u8; 42]);
        assert_eq!(
            size_of_path(&fs, Path::new("/input/records.txt")).unwrap(),
            42
        );
    }

    #[test]
    fn test_deep_tree_does_not_recurse() {
        let fs = MemoryFileSystem::new();
        let mut path = PathBuf::from("/deep");
        for i in 0..2_000 {
            path.push(format!("d{}", i));
        }
        fs.add_file(path.join("leaf"), vec![0u8; 7]);

        let stats = scan_path(&fs, Path::new("/deep")).unwrap();
        assert_eq!(stats.bytes, 7);
        assert_eq!(stats.max_depth, 2_000);
    }

    #[test]
    fn test_local_tree() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("x/y");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("x/a"), vec![0u8; 10]).unwrap();
        std::fs::write(nested.join("b"), vec![0u8; 20]).unwrap();
        std::fs::write(nested.join("c"), vec![0u8; 30]).unwrap();

        assert_eq!(size_of_path(&LocalFileSystem, dir.path()).unwrap(), 60);
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_does_not_hide_siblings() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a"), vec![0u8; 10]).unwrap();
        std::fs::write(dir.path().join("b"), vec![0u8; 20]).unwrap();
        std::os::unix::fs::symlink(dir.path().join("missing"), dir.path().join("link"))
            .unwrap();

        assert_eq!(size_of_path(&LocalFileSystem, dir.path()).unwrap(), 30);
    }

    /// Lists a child directory that then cannot be listed
    struct VanishingChild;

    impl FileSystem for VanishingChild {
        fn exists(&self, _path: &Path) -> io::Result<bool> {
            Ok(true)
        }

        fn list_status(&self, path: &Path) -> io::Result<Vec<FileStatus>> {
            if path == Path::new("/in") {
                Ok(vec![
                    FileStatus::file("/in/a", 5),
                    FileStatus::directory("/in/gone"),
                ])
            } else {
                Err(io::Error::new(io::ErrorKind::NotFound, "gone"))
            }
        }

        fn open(&self, _path: &Path) -> io::Result<Box<dyn std::io::Read + '_>> {
            Err(io::Error::new(io::ErrorKind::Unsupported, "no reads"))
        }

        fn create(&self, _path: &Path) -> io::Result<Box<dyn std::io::Write + '_>> {
            Err(io::Error::new(io::ErrorKind::Unsupported, "no writes"))
        }

        fn create_dir_all(&self, _path: &Path) -> io::Result<()> {
            Ok(())
        }

        fn delete_recursive(&self, _path: &Path) -> io::Result<bool> {
            Ok(false)
        }
    }

    #[test]
    fn test_missing_subdirectory_is_an_error() {
        let err = size_of_path(&VanishingChild, Path::new("/in")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
