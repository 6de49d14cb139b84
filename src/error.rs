//! Error types for readonly-store-builder
//!
//! This module defines the error hierarchy for a store build:
//! - Configuration errors, raised before any I/O happens
//! - Precondition failures, raised before the temp path or engine is touched
//! - Build failures, which wrap whatever went wrong once the build started
//!
//! Design philosophy:
//! - Use thiserror for structured error types in library code
//! - Errors should be actionable - include the path or value involved
//! - Preserve error chains: every build failure keeps its original cause

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type returned by [`crate::builder::StoreBuilder::build`]
#[derive(Error, Debug)]
pub enum BuilderError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The build refused to start
    #[error("Precondition failed for '{}': {reason}", path.display())]
    PreconditionFailed { path: PathBuf, reason: String },

    /// Anything that went wrong after the build started
    #[error("Build failed: {0}")]
    BuildFailed(#[from] BuildError),
}

impl BuilderError {
    /// Check if this error happened before any build I/O was attempted
    pub fn is_pre_build(&self) -> bool {
        matches!(
            self,
            BuilderError::Config(_) | BuilderError::PreconditionFailed { .. }
        )
    }
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Chunk size outside the supported range
    #[error("Invalid chunk size {size}: chunk size must be in the range {min}...{max}")]
    InvalidChunkSize { size: u64, min: u64, max: u64 },

    /// Replication factor of zero
    #[error("Invalid replication factor {factor}: must be at least 1")]
    InvalidReplicationFactor { factor: u32 },

    /// Cluster without nodes
    #[error("Cluster '{name}' has no nodes")]
    EmptyCluster { name: String },

    /// Unparseable human-readable size
    #[error("Invalid size: {0}")]
    InvalidSize(String),

    /// I/O buffer size outside the supported range
    #[error("Invalid buffer size {size}: buffer size must be in the range 1...{max}")]
    InvalidBufferSize { size: u64, max: u64 },

    /// Cluster or store definition file could not be loaded
    #[error("Failed to load metadata from '{}': {reason}", path.display())]
    MetadataLoad { path: PathBuf, reason: String },
}

/// Causes of a failed build
#[derive(Error, Debug)]
pub enum BuildError {
    /// Temp directory could not be cleared
    #[error("Failed to clear temp directory '{}': {source}", path.display())]
    ClearTemp {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input size could not be computed
    #[error("Failed to compute size of input '{}': {source}", path.display())]
    SizeScan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The execution engine reported a failure
    #[error("Job {job_id} failed: {source}")]
    Engine {
        job_id: String,
        #[source]
        source: EngineError,
    },

    /// Post-build checksum failed
    #[error("Checksum failed: {0}")]
    Checksum(#[from] ChecksumError),
}

/// Checksum aggregation errors
#[derive(Error, Debug)]
pub enum ChecksumError {
    /// Directory listing failed
    #[error("Failed to list '{}': {source}", path.display())]
    List {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading a chunk file failed
    #[error("Failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the manifest failed
    #[error("Failed to write manifest '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ChecksumError {
    /// The path the failed operation was working on
    pub fn path(&self) -> &std::path::Path {
        match self {
            ChecksumError::List { path, .. } => path,
            ChecksumError::Read { path, .. } => path,
            ChecksumError::Write { path, .. } => path,
        }
    }
}

/// Errors reported by a [`crate::job::JobEngine`]
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine ran the job and it failed
    #[error("{reason}")]
    Failed { reason: String },

    /// A record could not be transformed
    #[error("Transform failed on record {record} of '{}': {reason}", path.display())]
    Transform {
        path: PathBuf,
        record: u64,
        reason: String,
    },

    /// I/O errors inside the engine
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for BuilderError
pub type Result<T> = std::result::Result<T, BuilderError>;

/// Result type alias for ChecksumError
pub type ChecksumResult<T> = std::result::Result<T, ChecksumError>;

/// Result type alias for EngineError
pub type EngineResult<T> = std::result::Result<T, EngineError>;
