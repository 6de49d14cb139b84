//! Digest-of-digests over a node directory
//!
//! Each file is streamed through its own MD5. The 16-byte file digests are
//! then fed, in checksum order, into a node-level MD5. Memory use is one I/O
//! buffer regardless of file size.

use super::order::digest_inputs;
use super::{to_hex, ChecksumOptions, DigestBytes, DIGEST_LEN, MANIFEST_FILE_NAME};
use crate::error::{ChecksumError, ChecksumResult};
use crate::fs::FileSystem;
use md5::{Digest as _, Md5};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Result of digesting one node directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeChecksum {
    /// Node directory that was digested
    pub node_dir: PathBuf,

    /// Node-level digest
    pub digest: DigestBytes,

    /// Files that went into the digest, in order
    pub files: Vec<PathBuf>,

    /// Total bytes read
    pub bytes: u64,
}

impl NodeChecksum {
    pub fn hex(&self) -> String {
        to_hex(&self.digest)
    }
}

/// Outcome of checking a node directory against its manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// Manifest matches the directory contents
    Match { digest: DigestBytes },
    /// Manifest and contents disagree
    Mismatch {
        expected: Vec<u8>,
        actual: DigestBytes,
    },
    /// No manifest in the directory
    Missing { actual: DigestBytes },
}

impl Verification {
    pub fn is_match(&self) -> bool {
        matches!(self, Verification::Match { .. })
    }
}

/// Stream one file through MD5
pub fn file_digest<F: FileSystem + ?Sized>(
    fs: &F,
    path: &Path,
    buffer: &mut [u8],
) -> ChecksumResult<(DigestBytes, u64)> {
    let read_err = |source: io::Error| ChecksumError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut input = fs.open(path).map_err(read_err)?;
    let mut hasher = Md5::new();
    let mut total = 0u64;

    loop {
        let n = match input.read(buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(read_err(e)),
        };
        hasher.update(&buffer[..n]);
        total += n as u64;
    }

    Ok((finish(hasher), total))
}

/// Compute a node directory's digest without writing anything
pub fn compute_node_digest<F: FileSystem + ?Sized>(
    fs: &F,
    node_dir: &Path,
    options: &ChecksumOptions,
) -> ChecksumResult<NodeChecksum> {
    let entries = fs.list_status(node_dir).map_err(|source| ChecksumError::List {
        path: node_dir.to_path_buf(),
        source,
    })?;

    let inputs = digest_inputs(entries, options.order, MANIFEST_FILE_NAME);
    let mut buffer = vec![0u8; options.buffer_size.max(1)];
    let mut node_hasher = Md5::new();
    let mut files = Vec::with_capacity(inputs.len());
    let mut bytes = 0u64;

    for status in inputs {
        let (digest, read) = file_digest(fs, &status.path, &mut buffer)?;
        debug!(file = %status.path.display(), digest = %to_hex(&digest), "Digested file");
        node_hasher.update(digest);
        bytes += read;
        files.push(status.path);
    }

    Ok(NodeChecksum {
        node_dir: node_dir.to_path_buf(),
        digest: finish(node_hasher),
        files,
        bytes,
    })
}

/// Digest a node directory and write its manifest.
///
/// The manifest is only created once the digest is complete, so a failed
/// read never leaves a partial manifest behind.
pub fn aggregate<F: FileSystem + ?Sized>(
    fs: &F,
    node_dir: &Path,
    options: &ChecksumOptions,
) -> ChecksumResult<NodeChecksum> {
    let checksum = compute_node_digest(fs, node_dir, options)?;
    write_manifest(fs, node_dir, &checksum.digest)?;

    info!(
        node = %node_dir.display(),
        files = checksum.files.len(),
        bytes = checksum.bytes,
        digest = %checksum.hex(),
        "Wrote node checksum"
    );
    Ok(checksum)
}

/// Run [`aggregate`] over every directory directly under `output`
pub fn aggregate_all<F: FileSystem + ?Sized>(
    fs: &F,
    output: &Path,
    options: &ChecksumOptions,
) -> ChecksumResult<Vec<NodeChecksum>> {
    node_dirs(fs, output)?
        .iter()
        .map(|dir| aggregate(fs, dir, options))
        .collect()
}

/// Recompute a node directory's digest and compare it with its manifest
pub fn verify<F: FileSystem + ?Sized>(
    fs: &F,
    node_dir: &Path,
    options: &ChecksumOptions,
) -> ChecksumResult<Verification> {
    let expected = read_manifest(fs, node_dir)?;
    let actual = compute_node_digest(fs, node_dir, options)?.digest;

    let verification = match expected {
        None => Verification::Missing { actual },
        Some(expected) if expected.as_slice() == actual.as_slice() => {
            Verification::Match { digest: actual }
        }
        Some(expected) => Verification::Mismatch { expected, actual },
    };

    if !verification.is_match() {
        warn!(node = %node_dir.display(), result = ?verification, "Checksum verification failed");
    }
    Ok(verification)
}

/// Run [`verify`] over every directory directly under `output`
pub fn verify_all<F: FileSystem + ?Sized>(
    fs: &F,
    output: &Path,
    options: &ChecksumOptions,
) -> ChecksumResult<Vec<(PathBuf, Verification)>> {
    node_dirs(fs, output)?
        .into_iter()
        .map(|dir| verify(fs, &dir, options).map(|v| (dir, v)))
        .collect()
}

/// Read a node's stored manifest, if it has one
pub fn read_manifest<F: FileSystem + ?Sized>(
    fs: &F,
    node_dir: &Path,
) -> ChecksumResult<Option<Vec<u8>>> {
    let path = node_dir.join(MANIFEST_FILE_NAME);
    let exists = fs.exists(&path).map_err(|source| ChecksumError::Read {
        path: path.clone(),
        source,
    })?;
    if !exists {
        return Ok(None);
    }

    let mut contents = Vec::with_capacity(DIGEST_LEN);
    fs.open(&path)
        .and_then(|mut input| input.read_to_end(&mut contents))
        .map_err(|source| ChecksumError::Read {
            path: path.clone(),
            source,
        })?;
    Ok(Some(contents))
}

fn write_manifest<F: FileSystem + ?Sized>(
    fs: &F,
    node_dir: &Path,
    digest: &DigestBytes,
) -> ChecksumResult<()> {
    let path = node_dir.join(MANIFEST_FILE_NAME);
    let write_err = |source: io::Error| ChecksumError::Write {
        path: path.clone(),
        source,
    };

    let mut out = fs.create(&path).map_err(write_err)?;
    out.write_all(digest).map_err(write_err)?;
    out.flush().map_err(write_err)?;
    Ok(())
}

fn node_dirs<F: FileSystem + ?Sized>(fs: &F, output: &Path) -> ChecksumResult<Vec<PathBuf>> {
    let entries = fs.list_status(output).map_err(|source| ChecksumError::List {
        path: output.to_path_buf(),
        source,
    })?;
    Ok(entries
        .into_iter()
        .filter(|s| s.is_dir)
        .map(|s| s.path)
        .collect())
}

fn finish(hasher: Md5) -> DigestBytes {
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(&hasher.finalize());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::ChecksumOrder;
    use crate::fs::{FileStatus, MemoryFileSystem};

    fn md5_of(data: &[u8]) -> DigestBytes {
        let mut hasher = Md5::new();
        hasher.update(data);
        finish(hasher)
    }

    fn expected_node_digest(files: &[&[u8]]) -> DigestBytes {
        let mut node = Md5::new();
        for data in files {
            node.update(md5_of(data));
        }
        finish(node)
    }

    fn node_fixture() -> MemoryFileSystem {
        let fs = MemoryFileSystem::new();
        fs.add_file("/out/node-0/a.index", b"index-a".to_vec());
        fs.add_file("/out/node-0/b.data", b"data-b".to_vec());
        fs.add_file("/out/node-0/c.data", b"data-c".to_vec());
        fs.add_file("/out/node-0/.hidden", b"ignored".to_vec());
        fs
    }

    #[test]
    fn test_order_and_hidden_exclusion() {
        let fs = node_fixture();
        let checksum =
            compute_node_digest(&fs, Path::new("/out/node-0"), &ChecksumOptions::default())
                .unwrap();

        let names: Vec<_> = checksum
            .files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["b.data", "c.data", "a.index"]);
        assert_eq!(
            checksum.digest,
            expected_node_digest(&[&b"data-b"[..], &b"data-c"[..], &b"index-a"[..]])
        );
    }

    #[test]
    fn test_digest_of_digests_not_raw_bytes() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/n/0.data", b"hello".to_vec());
        let checksum = compute_node_digest(&fs, Path::new("/n"), &ChecksumOptions::default())
            .unwrap();
        assert_ne!(checksum.digest, md5_of(b"hello"));
        assert_eq!(checksum.digest, md5_of(&md5_of(b"hello")));
    }

    #[test]
    fn test_small_buffer_matches_large_buffer() {
        let fs = MemoryFileSystem::new();
        let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        fs.add_file("/n/0.data", payload.clone());
        fs.add_file("/n/0.index", payload[..777].to_vec());

        let small = ChecksumOptions {
            buffer_size: 7,
            ..Default::default()
        };
        let a = compute_node_digest(&fs, Path::new("/n"), &small).unwrap();
        let b = compute_node_digest(&fs, Path::new("/n"), &ChecksumOptions::default()).unwrap();
        assert_eq!(a.digest, b.digest);
        assert_eq!(a.bytes, 10_777);
        assert_eq!(a.digest, expected_node_digest(&[&payload[..], &payload[..777]]));
    }

    #[test]
    fn test_aggregate_writes_manifest_and_is_idempotent() {
        let fs = node_fixture();
        let node = Path::new("/out/node-0");
        let options = ChecksumOptions::default();

        let first = aggregate(&fs, node, &options).unwrap();
        let manifest = fs.contents("/out/node-0/checkSum.txt").unwrap();
        assert_eq!(manifest, first.digest.to_vec());

        // The manifest now sits in the directory; it must not feed the rerun
        let second = aggregate(&fs, node, &options).unwrap();
        assert_eq!(first.digest, second.digest);
        assert_eq!(fs.contents("/out/node-0/checkSum.txt").unwrap(), manifest);
    }

    #[test]
    fn test_failed_read_leaves_no_manifest() {
        let fs = node_fixture();
        fs.fail_reads("/out/node-0/c.data");

        let err = aggregate(&fs, Path::new("/out/node-0"), &ChecksumOptions::default())
            .unwrap_err();
        assert!(matches!(err, ChecksumError::Read { .. }));
        assert_eq!(err.path(), Path::new("/out/node-0/c.data"));
        assert!(fs.contents("/out/node-0/checkSum.txt").is_none());
    }

    #[test]
    fn test_subdirectories_are_skipped() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/n/0.data", b"x".to_vec());
        fs.add_file("/n/nested/1.data", b"y".to_vec());

        let checksum = compute_node_digest(&fs, Path::new("/n"), &ChecksumOptions::default())
            .unwrap();
        assert_eq!(checksum.files, vec![PathBuf::from("/n/0.data")]);
    }

    #[test]
    fn test_listing_order_changes_digest_unless_sorted() {
        let forward = MemoryFileSystem::new();
        forward.add_file("/n/0.data", b"zero".to_vec());
        forward.add_file("/n/1.data", b"one".to_vec());

        let reverse = MemoryFileSystem::new();
        reverse.add_file("/n/1.data", b"one".to_vec());
        reverse.add_file("/n/0.data", b"zero".to_vec());

        let listing = ChecksumOptions::default();
        let a = compute_node_digest(&forward, Path::new("/n"), &listing).unwrap();
        let b = compute_node_digest(&reverse, Path::new("/n"), &listing).unwrap();
        assert_ne!(a.digest, b.digest);

        let sorted = ChecksumOptions {
            order: ChecksumOrder::ByName,
            ..Default::default()
        };
        let a = compute_node_digest(&forward, Path::new("/n"), &sorted).unwrap();
        let b = compute_node_digest(&reverse, Path::new("/n"), &sorted).unwrap();
        assert_eq!(a.digest, b.digest);
    }

    #[test]
    fn test_aggregate_all_only_visits_directories() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/out/node-0/0.data", b"a".to_vec());
        fs.add_file("/out/node-1/0.data", b"b".to_vec());
        fs.add_file("/out/_SUCCESS", Vec::<u8>::new());

        let sums = aggregate_all(&fs, Path::new("/out"), &ChecksumOptions::default()).unwrap();
        assert_eq!(sums.len(), 2);
        assert!(fs.contents("/out/node-0/checkSum.txt").is_some());
        assert!(fs.contents("/out/node-1/checkSum.txt").is_some());
        assert!(fs
            .list_status(Path::new("/out"))
            .unwrap()
            .contains(&FileStatus::file("/out/_SUCCESS", 0)));
    }

    #[test]
    fn test_verify() {
        let fs = node_fixture();
        let node = Path::new("/out/node-0");
        let options = ChecksumOptions::default();

        assert!(matches!(
            verify(&fs, node, &options).unwrap(),
            Verification::Missing { .. }
        ));

        aggregate(&fs, node, &options).unwrap();
        assert!(verify(&fs, node, &options).unwrap().is_match());

        fs.add_file("/out/node-0/b.data", b"tampered".to_vec());
        assert!(matches!(
            verify(&fs, node, &options).unwrap(),
            Verification::Mismatch { .. }
        ));
    }
}
