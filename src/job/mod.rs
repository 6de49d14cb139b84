//! Build job model
//!
//! A build is handed to an execution engine as a [`JobSpec`]. The engine
//! reads records from the input, maps each one through a [`RecordTransform`],
//! routes the resulting key to a reduce partition with a
//! [`PartitionStrategy`], and for every partition writes one sorted chunk
//! through a [`ChunkWriter`]:
//!
//! ```text
//!   input records ──► transform ──► partition ──► sort ──► chunk writer
//!                                     │
//!                     partition r ──► node r / num_chunks
//!                                     chunk r % num_chunks
//! ```
//!
//! [`local::LocalEngine`] runs this in a single process.

pub mod local;

pub use crate::chunk::ChunkId;
pub use local::{BinaryChunkWriter, HashPartitioner, LocalEngine, TabSeparatedTransform};

use crate::cluster::{Cluster, StoreDefinition};
use crate::error::EngineResult;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// A mapped record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct KeyValue {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl KeyValue {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A record the transform could not handle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct RecordError(pub String);

/// Maps raw input records to key/value pairs
pub trait RecordTransform: Send + Sync {
    /// Short name used in logs and job properties
    fn name(&self) -> &str;

    /// Map one record. `Ok(None)` drops the record.
    fn transform(&self, record: &[u8]) -> Result<Option<KeyValue>, RecordError>;
}

/// Assigns keys to reduce partitions
pub trait PartitionStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Partition for `key`; must be below `num_partitions`
    fn partition(&self, key: &[u8], num_partitions: u32) -> u32;
}

/// Writes one sorted chunk as a data/index file pair
pub trait ChunkWriter: Send + Sync {
    fn name(&self) -> &str;

    /// Write `records` (sorted by key) to the data and index streams
    fn write_chunk(
        &self,
        records: &[KeyValue],
        data: &mut dyn Write,
        index: &mut dyn Write,
    ) -> io::Result<()>;
}

/// Executes build jobs.
///
/// `run` blocks until the job has finished. Every chunk file must be in
/// place under the job's final output path when it returns `Ok`.
pub trait JobEngine {
    fn name(&self) -> &str;

    fn run(&self, job: &JobSpec) -> EngineResult<()>;
}

impl<E: JobEngine + ?Sized> JobEngine for &E {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn run(&self, job: &JobSpec) -> EngineResult<()> {
        (**self).run(job)
    }
}

/// Everything an engine needs to run one build
#[derive(Clone)]
pub struct JobSpec {
    /// Unique job id
    pub id: Uuid,

    /// When the job was assembled
    pub submitted_at: DateTime<Utc>,

    pub input_path: PathBuf,

    /// Scratch space for intermediate output
    pub temp_path: PathBuf,

    /// Where the node directories end up
    pub output_path: PathBuf,

    /// Reduce partitions (`num_nodes × num_chunks`)
    pub num_reduce_tasks: u32,

    /// Chunks per node
    pub num_chunks: u32,

    pub cluster: Cluster,
    pub store: StoreDefinition,

    /// Replication factor for the files the engine writes
    pub output_replication_factor: u32,

    /// I/O buffer size in bytes
    pub buffer_size: usize,

    pub transform: Arc<dyn RecordTransform>,
    pub partitioner: Arc<dyn PartitionStrategy>,
    pub writer: Arc<dyn ChunkWriter>,
}

impl JobSpec {
    /// Chunk that reduce partition `partition` writes.
    ///
    /// Returns `None` if the partition is out of range.
    pub fn chunk_for_partition(&self, partition: u32) -> Option<ChunkId> {
        if self.num_chunks == 0 || partition >= self.num_reduce_tasks {
            return None;
        }
        let node = self
            .cluster
            .nodes()
            .get((partition / self.num_chunks) as usize)?;
        Some(ChunkId::new(node.id, partition % self.num_chunks))
    }

    /// Scalar settings as flat key/value properties
    pub fn properties(&self) -> BTreeMap<String, String> {
        let mut props = BTreeMap::new();
        props.insert(
            "final.output.dir".to_string(),
            self.output_path.display().to_string(),
        );
        props.insert("num.chunks".to_string(), self.num_chunks.to_string());
        props.insert(
            "store.output.replication.factor".to_string(),
            self.output_replication_factor.to_string(),
        );
        props.insert("io.file.buffer.size".to_string(), self.buffer_size.to_string());
        props.insert("store.name".to_string(), self.store.name().to_string());
        props.insert(
            "cluster.num.nodes".to_string(),
            self.cluster.num_nodes().to_string(),
        );
        props
    }
}

impl fmt::Debug for JobSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobSpec")
            .field("id", &self.id)
            .field("submitted_at", &self.submitted_at)
            .field("input_path", &self.input_path)
            .field("temp_path", &self.temp_path)
            .field("output_path", &self.output_path)
            .field("num_reduce_tasks", &self.num_reduce_tasks)
            .field("num_chunks", &self.num_chunks)
            .field("store", &self.store.name())
            .field("transform", &self.transform.name())
            .field("partitioner", &self.partitioner.name())
            .field("writer", &self.writer.name())
            .finish_non_exhaustive()
    }
}
