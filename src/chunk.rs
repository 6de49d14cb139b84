//! Chunk identity and output layout
//!
//! ```text
//! output/
//!   node-<id>/
//!     <chunk>.data
//!     <chunk>.index
//!     checkSum.txt
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

/// Suffix of chunk data files
pub const DATA_FILE_SUFFIX: &str = ".data";

/// Suffix of chunk index files
pub const INDEX_FILE_SUFFIX: &str = ".index";

/// Prefix of per-node output directories
pub const NODE_DIR_PREFIX: &str = "node-";

/// A chunk is identified by the node that holds it and its index there
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId {
    pub node_id: u32,
    pub chunk_index: u32,
}

impl ChunkId {
    pub fn new(node_id: u32, chunk_index: u32) -> Self {
        Self {
            node_id,
            chunk_index,
        }
    }

    pub fn data_file_name(&self) -> String {
        format!("{}{}", self.chunk_index, DATA_FILE_SUFFIX)
    }

    pub fn index_file_name(&self) -> String {
        format!("{}{}", self.chunk_index, INDEX_FILE_SUFFIX)
    }

    /// Data file path under a build's output directory
    pub fn data_path(&self, output: &Path) -> PathBuf {
        node_dir(output, self.node_id).join(self.data_file_name())
    }

    /// Index file path under a build's output directory
    pub fn index_path(&self, output: &Path) -> PathBuf {
        node_dir(output, self.node_id).join(self.index_file_name())
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", NODE_DIR_PREFIX, self.node_id, self.chunk_index)
    }
}

/// Directory holding a node's chunks
pub fn node_dir(output: &Path, node_id: u32) -> PathBuf {
    output.join(format!("{}{}", NODE_DIR_PREFIX, node_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_paths() {
        let chunk = ChunkId::new(3, 7);
        let out = Path::new("/stores/users");
        assert_eq!(chunk.data_path(out), PathBuf::from("/stores/users/node-3/7.data"));
        assert_eq!(chunk.index_path(out), PathBuf::from("/stores/users/node-3/7.index"));
        assert_eq!(chunk.to_string(), "node-3/7");
    }
}
