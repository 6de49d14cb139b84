//! Build orchestration
//!
//! [`StoreBuilder::build`] drives one store build end to end:
//!
//! ```text
//! check output absent ──► clear temp ──► size input ──► plan chunks
//!                                                          │
//!        checksum node dirs ◄── (engine runs job) ◄── assemble job
//! ```
//!
//! Nothing is retried and nothing is cleaned up after a failure. The
//! output path check is advisory; two concurrent builds against the same
//! output are not detected.

use crate::checksum::{aggregate_all, NodeChecksum};
use crate::cluster::{Cluster, StoreDefinition};
use crate::config::BuildConfig;
use crate::error::{BuildError, BuilderError, Result};
use crate::fs::FileSystem;
use crate::job::{
    BinaryChunkWriter, ChunkWriter, HashPartitioner, JobEngine, JobSpec, PartitionStrategy,
    RecordTransform, TabSeparatedTransform,
};
use crate::plan::{compute_chunk_plan, ChunkPlan};
use crate::walker::size_of_path;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

/// What a successful build produced
#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub job_id: Uuid,

    /// Input size at the time of the build
    pub input_bytes: u64,

    pub plan: ChunkPlan,

    /// One entry per node directory; empty when checksums are disabled
    pub checksums: Vec<NodeChecksum>,

    pub duration: Duration,
}

/// Builds a read-only store on a cluster.
///
/// The record transform, partitioner and chunk writer default to the
/// line-oriented local strategies and can be swapped with the `with_*`
/// methods.
pub struct StoreBuilder<F, E> {
    fs: F,
    engine: E,
    cluster: Cluster,
    store: StoreDefinition,
    config: BuildConfig,
    transform: Arc<dyn RecordTransform>,
    partitioner: Arc<dyn PartitionStrategy>,
    writer: Arc<dyn ChunkWriter>,
}

impl<F: FileSystem, E: JobEngine> StoreBuilder<F, E> {
    pub fn new(
        fs: F,
        engine: E,
        cluster: Cluster,
        store: StoreDefinition,
        config: BuildConfig,
    ) -> Self {
        Self {
            fs,
            engine,
            cluster,
            store,
            config,
            transform: Arc::new(TabSeparatedTransform),
            partitioner: Arc::new(HashPartitioner),
            writer: Arc::new(BinaryChunkWriter),
        }
    }

    /// Use a different record transform
    pub fn with_transform(mut self, transform: Arc<dyn RecordTransform>) -> Self {
        self.transform = transform;
        self
    }

    /// Use a different partition strategy
    pub fn with_partitioner(mut self, partitioner: Arc<dyn PartitionStrategy>) -> Self {
        self.partitioner = partitioner;
        self
    }

    /// Use a different chunk writer
    pub fn with_chunk_writer(mut self, writer: Arc<dyn ChunkWriter>) -> Self {
        self.writer = writer;
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    pub fn store(&self) -> &StoreDefinition {
        &self.store
    }

    /// Run the build and block until it finishes
    pub fn build(&self) -> Result<BuildSummary> {
        let start = Instant::now();
        self.check_output_absent()?;

        let temp = self.config.temp_path();
        let cleared = self
            .fs
            .delete_recursive(temp)
            .map_err(|source| BuildError::ClearTemp {
                path: temp.to_path_buf(),
                source,
            })?;
        debug!(temp = %temp.display(), cleared, "Cleared temp directory");

        let input = self.config.input_path();
        let input_bytes = size_of_path(&self.fs, input).map_err(|source| BuildError::SizeScan {
            path: input.to_path_buf(),
            source,
        })?;
        info!(input = %input.display(), size = input_bytes, "Computed input size");

        let plan = compute_chunk_plan(
            input_bytes,
            self.store.replication_factor(),
            self.cluster.num_nodes(),
            self.config.chunk_size_bytes(),
        );
        info!(
            store = self.store.name(),
            nodes = self.cluster.num_nodes(),
            replication = self.store.replication_factor(),
            chunk_size = self.config.chunk_size_bytes(),
            chunks_per_node = plan.num_chunks_per_node,
            parallelism = plan.total_parallelism,
            "Planned chunks"
        );

        let job = self.job_spec(&plan);
        info!(job_id = %job.id, engine = self.engine.name(), "Submitting job");
        self.engine
            .run(&job)
            .map_err(|source| BuildError::Engine {
                job_id: job.id.to_string(),
                source,
            })?;
        info!(job_id = %job.id, "Job finished");

        let checksums = if self.config.checksum_enabled() {
            aggregate_all(
                &self.fs,
                self.config.output_path(),
                &self.config.checksum_options(),
            )
            .map_err(BuildError::Checksum)?
        } else {
            Vec::new()
        };

        Ok(BuildSummary {
            job_id: job.id,
            input_bytes,
            plan,
            checksums,
            duration: start.elapsed(),
        })
    }

    fn check_output_absent(&self) -> Result<()> {
        let output = self.config.output_path();
        let exists = self
            .fs
            .exists(output)
            .map_err(|e| BuilderError::PreconditionFailed {
                path: output.to_path_buf(),
                reason: format!("could not check output path: {}", e),
            })?;
        if exists {
            return Err(BuilderError::PreconditionFailed {
                path: output.to_path_buf(),
                reason: "output directory already exists".to_string(),
            });
        }
        Ok(())
    }

    fn job_spec(&self, plan: &ChunkPlan) -> JobSpec {
        JobSpec {
            id: Uuid::new_v4(),
            submitted_at: Utc::now(),
            input_path: self.config.input_path().to_path_buf(),
            temp_path: self.config.temp_path().to_path_buf(),
            output_path: self.config.output_path().to_path_buf(),
            num_reduce_tasks: plan.total_parallelism,
            num_chunks: plan.num_chunks_per_node,
            cluster: self.cluster.clone(),
            store: self.store.clone(),
            output_replication_factor: self.config.replication_factor(),
            buffer_size: self.config.buffer_size(),
            transform: Arc::clone(&self.transform),
            partitioner: Arc::clone(&self.partitioner),
            writer: Arc::clone(&self.writer),
        }
    }
}
