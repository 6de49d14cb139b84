//! File ordering for node checksums
//!
//! Entries are put into three tiers: directories, then files that are not
//! index files, then index files. The sort is stable, so within a tier the
//! listing order is kept unless [`ChecksumOrder::ByName`] is requested.

use crate::chunk::INDEX_FILE_SUFFIX;
use crate::fs::FileStatus;
use serde::{Deserialize, Serialize};

/// Tier of a node directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntryClass {
    Directory,
    DataFile,
    IndexFile,
}

impl EntryClass {
    pub fn of(status: &FileStatus) -> Self {
        if status.is_dir {
            EntryClass::Directory
        } else if status.name().ends_with(INDEX_FILE_SUFFIX) {
            EntryClass::IndexFile
        } else {
            EntryClass::DataFile
        }
    }
}

/// How ties within a tier are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumOrder {
    /// Keep the order the filesystem listed entries in
    #[default]
    Listing,
    /// Sort by file name within each tier.
    ///
    /// Digests differ from `Listing` whenever the listing was not already
    /// name-ordered.
    ByName,
}

/// Stable-sort entries into checksum order
pub fn order_entries(mut entries: Vec<FileStatus>, order: ChecksumOrder) -> Vec<FileStatus> {
    match order {
        ChecksumOrder::Listing => entries.sort_by_key(EntryClass::of),
        ChecksumOrder::ByName => entries.sort_by(|a, b| {
            EntryClass::of(a)
                .cmp(&EntryClass::of(b))
                .then_with(|| a.name().cmp(b.name()))
        }),
    }
    entries
}

/// Files that feed the node digest, in digest order.
///
/// Directories, hidden entries and the manifest itself are dropped.
pub fn digest_inputs(
    entries: Vec<FileStatus>,
    order: ChecksumOrder,
    manifest_name: &str,
) -> Vec<FileStatus> {
    order_entries(entries, order)
        .into_iter()
        .filter(|s| !s.is_dir)
        .filter(|s| !s.is_hidden())
        .filter(|s| s.name() != manifest_name)
        .collect()
}
