//! readonly-store-builder - Build Partitioned Read-Only Key-Value Stores
//!
//! Turns bulk input into a store that is split into chunks, spread over the
//! nodes of a serving cluster and replicated. The crate decides how many
//! chunks each node holds, hands the build to an execution engine, and
//! afterwards writes a per-node checksum manifest so a serving node can
//! verify what it fetched.
//!
//! # Features
//!
//! - **Chunk Planning**: Sizes the input and derives chunks per node from
//!   the store's replication factor, the node count and a target chunk size.
//!
//! - **Pluggable Execution**: The engine, record transform, partitioner and
//!   chunk writer are traits. A single-process engine is included.
//!
//! - **Checksum Manifests**: MD5 of the per-file MD5s of every node
//!   directory, written to `checkSum.txt`, with verification.
//!
//! - **Backend Agnostic**: All storage access goes through a filesystem
//!   trait with local and in-memory backends.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                      StoreBuilder                          │
//! │                                                            │
//! │   output absent? ──► clear temp ──► size input (walker)    │
//! │                                          │                 │
//! │                                          ▼                 │
//! │                               compute_chunk_plan (plan)    │
//! │                                          │                 │
//! │                                          ▼                 │
//! │                                JobSpec ──► JobEngine       │
//! │                                          │                 │
//! └──────────────────────────────────────────┼─────────────────┘
//!                                            ▼
//!                       output/node-<id>/<chunk>.data|.index
//!                                            │
//!                                            ▼
//!                       checksum::aggregate ──► checkSum.txt
//! ```
//!
//! # Example
//!
//! ```bash
//! # Show the plan
//! readonly-store-builder plan --cluster cluster.json --store store.json --input data/
//!
//! # Build with manifests
//! readonly-store-builder build --cluster cluster.json --store store.json \
//!     --input data/ --temp /tmp/build --output stores/users --checksum
//!
//! # Check manifests later
//! readonly-store-builder verify stores/users
//! ```

pub mod builder;
pub mod checksum;
pub mod chunk;
pub mod cluster;
pub mod config;
pub mod error;
pub mod fs;
pub mod job;
pub mod plan;
pub mod progress;
pub mod walker;

pub use builder::{BuildSummary, StoreBuilder};
pub use chunk::ChunkId;
pub use cluster::{Cluster, Node, StoreDefinition};
pub use config::{BuildConfig, CliArgs};
pub use error::{BuilderError, Result};
pub use plan::{compute_chunk_plan, ChunkPlan};
