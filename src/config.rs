//! Configuration types for readonly-store-builder
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - The validated, immutable build configuration
//! - Human-readable size parsing

use crate::checksum::{ChecksumOptions, ChecksumOrder, DEFAULT_BUFFER_SIZE};
use crate::error::ConfigError;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

/// Smallest allowed chunk size in bytes
pub const MIN_CHUNK_SIZE: u64 = 1;

/// Largest allowed chunk size in bytes (1.9 GiB, truncated)
pub const MAX_CHUNK_SIZE: u64 = 19 * 1024 * 1024 * 1024 / 10;

/// Largest allowed I/O buffer in bytes (64 MiB)
pub const MAX_BUFFER_SIZE: usize = 64 * 1024 * 1024;

/// Chunk size used when none is given (1 GiB)
pub const DEFAULT_CHUNK_SIZE: u64 = 1024 * 1024 * 1024;

/// Build read-only key-value stores from bulk input
#[derive(Parser, Debug, Clone)]
#[command(
    name = "readonly-store-builder",
    version,
    about = "Build partitioned, replicated read-only key-value stores",
    long_about = "Sizes the input, decides how many chunks each serving node holds, runs the \
                  build and writes a per-node checksum manifest.\n\n\
                  The bundled local engine reads input records as 'key<TAB>value' lines.",
    after_help = "EXAMPLES:\n    \
        readonly-store-builder plan --cluster cluster.json --store store.json --input data/\n    \
        readonly-store-builder build --cluster cluster.json --store store.json \\\n        \
            --input data/ --temp /tmp/build --output stores/users --checksum\n    \
        readonly-store-builder checksum stores/users\n    \
        readonly-store-builder verify stores/users"
)]
pub struct CliArgs {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build a store with the local engine
    Build {
        /// Cluster definition (JSON)
        #[arg(long, value_name = "FILE")]
        cluster: PathBuf,

        /// Store definition (JSON)
        #[arg(long, value_name = "FILE")]
        store: PathBuf,

        /// Input directory or file
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Temp directory for intermediate output (cleared before the build)
        #[arg(long, value_name = "DIR")]
        temp: PathBuf,

        /// Final output directory (must not exist)
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Target chunk size (e.g., "1GB", "256MB")
        #[arg(long, default_value = "1GB", value_name = "SIZE")]
        chunk_size: String,

        /// Output replication factor (defaults to the store's)
        #[arg(long, value_name = "NUM")]
        replication: Option<u32>,

        /// Write a checksum manifest into every node directory
        #[arg(long)]
        checksum: bool,

        #[command(flatten)]
        checksum_args: ChecksumArgs,
    },

    /// Show the chunk plan for an input without building
    Plan {
        /// Cluster definition (JSON)
        #[arg(long, value_name = "FILE")]
        cluster: PathBuf,

        /// Store definition (JSON)
        #[arg(long, value_name = "FILE")]
        store: PathBuf,

        /// Input directory or file
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Target chunk size (e.g., "1GB", "256MB")
        #[arg(long, default_value = "1GB", value_name = "SIZE")]
        chunk_size: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = PlanFormat::Text)]
        format: PlanFormat,
    },

    /// (Re)write checksum manifests for an existing build output
    Checksum {
        /// Build output directory
        #[arg(value_name = "OUTPUT_DIR")]
        output: PathBuf,

        #[command(flatten)]
        checksum_args: ChecksumArgs,
    },

    /// Check node directories against their manifests
    Verify {
        /// Build output directory
        #[arg(value_name = "OUTPUT_DIR")]
        output: PathBuf,

        #[command(flatten)]
        checksum_args: ChecksumArgs,
    },
}

/// Checksum flags shared by several subcommands
#[derive(clap::Args, Debug, Clone)]
pub struct ChecksumArgs {
    /// Sort files by name within each checksum tier instead of using
    /// listing order (changes digests)
    #[arg(long)]
    pub sorted_checksum: bool,

    /// Read buffer used while checksumming (e.g., "64KB")
    #[arg(long, default_value = "64KB", value_name = "SIZE")]
    pub buffer_size: String,
}

impl ChecksumArgs {
    /// Validate into checksum options
    pub fn to_options(&self) -> Result<ChecksumOptions, ConfigError> {
        let buffer_size = validate_buffer_size(parse_size(&self.buffer_size)?)?;
        Ok(ChecksumOptions {
            buffer_size,
            order: if self.sorted_checksum {
                ChecksumOrder::ByName
            } else {
                ChecksumOrder::Listing
            },
        })
    }
}

/// Output format of the `plan` subcommand
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanFormat {
    Text,
    Json,
}

/// Parse a human-readable size string (e.g., "1GB", "64KB")
pub fn parse_size(s: &str) -> Result<u64, ConfigError> {
    let s = s.trim().to_uppercase();

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix("TB") {
        (n, 1024u64 * 1024 * 1024 * 1024)
    } else if let Some(n) = s.strip_suffix("GB") {
        (n, 1024u64 * 1024 * 1024)
    } else if let Some(n) = s.strip_suffix("MB") {
        (n, 1024u64 * 1024)
    } else if let Some(n) = s.strip_suffix("KB") {
        (n, 1024u64)
    } else if let Some(n) = s.strip_suffix('B') {
        (n, 1u64)
    } else {
        // Assume bytes if no suffix
        (s.as_str(), 1u64)
    };

    let num: f64 = num_str
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidSize(format!("Invalid size value: {}", s)))?;
    if !num.is_finite() || num < 0.0 {
        return Err(ConfigError::InvalidSize(format!("Invalid size value: {}", s)));
    }

    Ok((num * multiplier as f64) as u64)
}

/// Check a chunk size against [`MIN_CHUNK_SIZE`] and [`MAX_CHUNK_SIZE`]
pub fn validate_chunk_size(bytes: u64) -> Result<u64, ConfigError> {
    if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&bytes) {
        return Err(ConfigError::InvalidChunkSize {
            size: bytes,
            min: MIN_CHUNK_SIZE,
            max: MAX_CHUNK_SIZE,
        });
    }
    Ok(bytes)
}

/// Check an I/O buffer size against `1..=`[`MAX_BUFFER_SIZE`]
pub fn validate_buffer_size(bytes: u64) -> Result<usize, ConfigError> {
    let invalid = || ConfigError::InvalidBufferSize {
        size: bytes,
        max: MAX_BUFFER_SIZE as u64,
    };
    let size = usize::try_from(bytes).map_err(|_| invalid())?;
    if !(1..=MAX_BUFFER_SIZE).contains(&size) {
        return Err(invalid());
    }
    Ok(size)
}

/// Validated build configuration.
///
/// Constructed once through [`BuildConfig::builder`]; there are no setters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    chunk_size_bytes: u64,
    replication_factor: u32,
    input_path: PathBuf,
    temp_path: PathBuf,
    output_path: PathBuf,
    checksum_enabled: bool,
    checksum: ChecksumOptions,
}

impl BuildConfig {
    /// Start a configuration for the given input, temp and output paths
    pub fn builder(
        input_path: impl Into<PathBuf>,
        temp_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> BuildConfigBuilder {
        BuildConfigBuilder {
            chunk_size_bytes: DEFAULT_CHUNK_SIZE,
            replication_factor: 1,
            input_path: input_path.into(),
            temp_path: temp_path.into(),
            output_path: output_path.into(),
            checksum_enabled: false,
            checksum: ChecksumOptions::default(),
        }
    }

    /// Create and validate configuration from `build` subcommand arguments
    pub fn from_build_args(
        input: &Path,
        temp: &Path,
        output: &Path,
        chunk_size: &str,
        replication_factor: u32,
        checksum: bool,
        checksum_args: &ChecksumArgs,
    ) -> Result<Self, ConfigError> {
        let options = checksum_args.to_options()?;
        BuildConfig::builder(input, temp, output)
            .chunk_size_bytes(parse_size(chunk_size)?)
            .replication_factor(replication_factor)
            .checksum_enabled(checksum)
            .buffer_size(options.buffer_size)
            .checksum_order(options.order)
            .build()
    }

    pub fn chunk_size_bytes(&self) -> u64 {
        self.chunk_size_bytes
    }

    /// Replication factor recorded for the build output
    pub fn replication_factor(&self) -> u32 {
        self.replication_factor
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn checksum_enabled(&self) -> bool {
        self.checksum_enabled
    }

    /// I/O buffer size for the job and for checksum streaming
    pub fn buffer_size(&self) -> usize {
        self.checksum.buffer_size
    }

    pub fn checksum_options(&self) -> ChecksumOptions {
        self.checksum
    }
}

/// Builder for [`BuildConfig`]; validation happens in [`build`](Self::build)
#[derive(Debug, Clone)]
pub struct BuildConfigBuilder {
    chunk_size_bytes: u64,
    replication_factor: u32,
    input_path: PathBuf,
    temp_path: PathBuf,
    output_path: PathBuf,
    checksum_enabled: bool,
    checksum: ChecksumOptions,
}

impl BuildConfigBuilder {
    /// Set the target chunk size in bytes
    pub fn chunk_size_bytes(mut self, bytes: u64) -> Self {
        self.chunk_size_bytes = bytes;
        self
    }

    /// Set the output replication factor
    pub fn replication_factor(mut self, factor: u32) -> Self {
        self.replication_factor = factor;
        self
    }

    /// Enable or disable the post-build checksum
    pub fn checksum_enabled(mut self, enabled: bool) -> Self {
        self.checksum_enabled = enabled;
        self
    }

    /// Set the I/O buffer size
    pub fn buffer_size(mut self, bytes: usize) -> Self {
        self.checksum.buffer_size = bytes;
        self
    }

    /// Set how checksum ties are ordered
    pub fn checksum_order(mut self, order: ChecksumOrder) -> Self {
        self.checksum.order = order;
        self
    }

    /// Validate and freeze the configuration
    pub fn build(self) -> Result<BuildConfig, ConfigError> {
        validate_chunk_size(self.chunk_size_bytes)?;

        if self.replication_factor == 0 {
            return Err(ConfigError::InvalidReplicationFactor {
                factor: self.replication_factor,
            });
        }

        validate_buffer_size(self.checksum.buffer_size as u64)?;

        Ok(BuildConfig {
            chunk_size_bytes: self.chunk_size_bytes,
            replication_factor: self.replication_factor,
            input_path: self.input_path,
            temp_path: self.temp_path,
            output_path: self.output_path,
            checksum_enabled: self.checksum_enabled,
            checksum: self.checksum,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> BuildConfigBuilder {
        BuildConfig::builder("/in", "/tmp/build", "/out")
    }

    #[test]
    fn test_max_chunk_size_value() {
        assert_eq!(MAX_CHUNK_SIZE, 2_040_109_465);
        assert_eq!(MAX_CHUNK_SIZE, (1.9 * 1024.0 * 1024.0 * 1024.0) as u64);
    }

    #[test]
    fn test_chunk_size_bounds() {
        for size in [0, MAX_CHUNK_SIZE + 1, u64::MAX] {
            let err = builder().chunk_size_bytes(size).build().unwrap_err();
            assert!(matches!(err, ConfigError::InvalidChunkSize { size: s, .. } if s == size));
        }

        for size in [MIN_CHUNK_SIZE, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE] {
            assert_eq!(
                builder().chunk_size_bytes(size).build().unwrap().chunk_size_bytes(),
                size
            );
        }
    }

    #[test]
    fn test_defaults() {
        let config = builder().build().unwrap();
        assert!(!config.checksum_enabled());
        assert_eq!(config.replication_factor(), 1);
        assert_eq!(config.buffer_size(), DEFAULT_BUFFER_SIZE);
        assert_eq!(config.checksum_options().order, ChecksumOrder::Listing);
        assert_eq!(config.output_path(), Path::new("/out"));
    }

    #[test]
    fn test_zero_replication_rejected() {
        let err = builder().replication_factor(0).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidReplicationFactor { .. }));
    }

    #[test]
    fn test_zero_buffer_rejected() {
        let err = builder().buffer_size(0).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBufferSize { size: 0, .. }));

        let err = builder()
            .buffer_size(MAX_BUFFER_SIZE + 1)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBufferSize { .. }));
        assert!(builder().buffer_size(MAX_BUFFER_SIZE).build().is_ok());
    }

    #[test]
    fn test_oversized_buffer_flag_rejected() {
        for flag in ["100TB", "65MB", "0"] {
            let args = ChecksumArgs {
                sorted_checksum: false,
                buffer_size: flag.into(),
            };
            assert!(matches!(
                args.to_options(),
                Err(ConfigError::InvalidBufferSize { .. })
            ));
        }

        let args = ChecksumArgs {
            sorted_checksum: false,
            buffer_size: "64MB".into(),
        };
        assert_eq!(args.to_options().unwrap().buffer_size, MAX_BUFFER_SIZE);
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1GB").unwrap(), 1024 * 1024 * 1024);
        assert_eq!(parse_size("256mb").unwrap(), 256 * 1024 * 1024);
        assert_eq!(parse_size("64KB").unwrap(), 64 * 1024);
        assert_eq!(parse_size("1.5KB").unwrap(), 1536);
        assert_eq!(parse_size("100B").unwrap(), 100);
        assert_eq!(parse_size("1024").unwrap(), 1024);
        assert!(parse_size("lots").is_err());
        assert!(parse_size("-5MB").is_err());
    }

    #[test]
    fn test_from_build_args() {
        let args = ChecksumArgs {
            sorted_checksum: true,
            buffer_size: "4KB".into(),
        };
        let config = BuildConfig::from_build_args(
            Path::new("/in"),
            Path::new("/tmp"),
            Path::new("/out"),
            "512MB",
            3,
            true,
            &args,
        )
        .unwrap();

        assert_eq!(config.chunk_size_bytes(), 512 * 1024 * 1024);
        assert_eq!(config.replication_factor(), 3);
        assert!(config.checksum_enabled());
        assert_eq!(config.buffer_size(), 4096);
        assert_eq!(config.checksum_options().order, ChecksumOrder::ByName);

        let too_big = BuildConfig::from_build_args(
            Path::new("/in"),
            Path::new("/tmp"),
            Path::new("/out"),
            "2GB",
            1,
            false,
            &args,
        );
        assert!(matches!(too_big, Err(ConfigError::InvalidChunkSize { .. })));
    }

    #[test]
    fn test_cli_parses_build() {
        let args = CliArgs::try_parse_from([
            "readonly-store-builder",
            "build",
            "--cluster",
            "c.json",
            "--store",
            "s.json",
            "--input",
            "in",
            "--temp",
            "tmp",
            "--output",
            "out",
            "--checksum",
            "--sorted-checksum",
        ])
        .unwrap();

        match args.command {
            Command::Build {
                checksum,
                checksum_args,
                chunk_size,
                ..
            } => {
                assert!(checksum);
                assert!(checksum_args.sorted_checksum);
                assert_eq!(chunk_size, "1GB");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
