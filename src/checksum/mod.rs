//! Post-build checksums
//!
//! After a successful build every node directory gets a manifest holding an
//! MD5 of the MD5s of its chunk files. The digest depends on file order, so
//! the order is part of the contract:
//!
//! 1. directories first (never digested)
//! 2. files that are not index files
//! 3. index files
//!
//! Hidden files (leading `.`) and the manifest itself are skipped.

pub mod aggregate;
pub mod order;

pub use aggregate::{
    aggregate, aggregate_all, compute_node_digest, file_digest, read_manifest, verify,
    verify_all, NodeChecksum, Verification,
};
pub use order::{digest_inputs, order_entries, ChecksumOrder, EntryClass};

/// Name of the per-node manifest file
pub const MANIFEST_FILE_NAME: &str = "checkSum.txt";

/// Width of an MD5 digest
pub const DIGEST_LEN: usize = 16;

/// Raw MD5 digest bytes
pub type DigestBytes = [u8; DIGEST_LEN];

/// Default streaming buffer (64 KiB)
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Checksum settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecksumOptions {
    /// Size of the read buffer used to stream files
    pub buffer_size: usize,

    /// Tie-breaking within tiers
    pub order: ChecksumOrder,
}

impl Default for ChecksumOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            order: ChecksumOrder::Listing,
        }
    }
}

/// Lowercase hex rendering of digest bytes
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex(&[0x00, 0xab, 0x10]), "00ab10");
        assert_eq!(to_hex(&[0u8; DIGEST_LEN]).len(), 32);
    }
}
