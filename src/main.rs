//! readonly-store-builder - Build Partitioned Read-Only Key-Value Stores
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use humansize::{format_size, BINARY};
use readonly_store_builder::checksum::{aggregate_all, verify_all};
use readonly_store_builder::config::{
    parse_size, validate_chunk_size, BuildConfig, ChecksumArgs, CliArgs, Command, PlanFormat,
};
use readonly_store_builder::fs::LocalFileSystem;
use readonly_store_builder::job::LocalEngine;
use readonly_store_builder::progress::{
    print_build_summary, print_checksums, print_header, print_plan, print_verification,
    ProgressReporter,
};
use readonly_store_builder::walker::size_of_path;
use readonly_store_builder::{compute_chunk_plan, Cluster, StoreBuilder, StoreDefinition};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose, args.quiet)?;

    match args.command.clone() {
        Command::Build {
            cluster,
            store,
            input,
            temp,
            output,
            chunk_size,
            replication,
            checksum,
            checksum_args,
        } => run_build(
            &args,
            BuildArgs {
                cluster,
                store,
                input,
                temp,
                output,
                chunk_size,
                replication,
                checksum,
                checksum_args,
            },
        ),
        Command::Plan {
            cluster,
            store,
            input,
            chunk_size,
            format,
        } => run_plan(&cluster, &store, &input, &chunk_size, format),
        Command::Checksum {
            output,
            checksum_args,
        } => run_checksum(&args, &output, &checksum_args),
        Command::Verify {
            output,
            checksum_args,
        } => run_verify(&args, &output, &checksum_args),
    }
}

/// Arguments of the `build` subcommand
struct BuildArgs {
    cluster: PathBuf,
    store: PathBuf,
    input: PathBuf,
    temp: PathBuf,
    output: PathBuf,
    chunk_size: String,
    replication: Option<u32>,
    checksum: bool,
    checksum_args: ChecksumArgs,
}

fn load_topology(cluster: &Path, store: &Path) -> Result<(Cluster, StoreDefinition)> {
    let cluster = Cluster::from_json_file(cluster).context("Failed to load cluster")?;
    let store = StoreDefinition::from_json_file(store).context("Failed to load store")?;
    Ok((cluster, store))
}

fn run_build(args: &CliArgs, build: BuildArgs) -> Result<ExitCode> {
    let (cluster, store) = load_topology(&build.cluster, &build.store)?;

    let replication = build.replication.unwrap_or(store.replication_factor());
    let config = BuildConfig::from_build_args(
        &build.input,
        &build.temp,
        &build.output,
        &build.chunk_size,
        replication,
        build.checksum,
        &build.checksum_args,
    )
    .context("Invalid configuration")?;

    if !args.quiet {
        print_header(
            "build",
            &[
                ("Store", store.name().to_string()),
                ("Nodes", cluster.num_nodes().to_string()),
                ("Input", config.input_path().display().to_string()),
                ("Output", config.output_path().display().to_string()),
                ("Chunk Size", format_size(config.chunk_size_bytes(), BINARY)),
            ],
        );
    }

    let progress = if args.quiet {
        ProgressReporter::hidden()
    } else {
        ProgressReporter::new()
    };
    progress.set_status("Building store...");

    let builder = StoreBuilder::new(
        LocalFileSystem::new(),
        LocalEngine::new(LocalFileSystem::new()),
        cluster,
        store,
        config,
    );

    let summary = match builder.build() {
        Ok(summary) => summary,
        Err(e) => {
            progress.finish_and_clear();
            return Err(e).context("Build failed");
        }
    };
    progress.finish("Build completed");

    if !args.quiet {
        print_build_summary(&summary, builder.config().output_path());
    }
    info!(job_id = %summary.job_id, "Build succeeded");

    Ok(ExitCode::SUCCESS)
}

/// Machine-readable plan output
#[derive(Serialize)]
struct PlanReport<'a> {
    store: &'a str,
    replication_factor: u32,
    num_nodes: u32,
    input_bytes: u64,
    chunk_size_bytes: u64,
    num_chunks_per_node: u32,
    total_parallelism: u32,
}

fn run_plan(
    cluster: &Path,
    store: &Path,
    input: &Path,
    chunk_size: &str,
    format: PlanFormat,
) -> Result<ExitCode> {
    let (cluster, store) = load_topology(cluster, store)?;
    let chunk_size = parse_size(chunk_size)
        .and_then(validate_chunk_size)
        .context("Invalid configuration")?;

    let input_bytes = size_of_path(&LocalFileSystem::new(), input)
        .with_context(|| format!("Failed to size input '{}'", input.display()))?;
    let plan = compute_chunk_plan(
        input_bytes,
        store.replication_factor(),
        cluster.num_nodes(),
        chunk_size,
    );

    match format {
        PlanFormat::Text => print_plan(input_bytes, cluster.num_nodes(), chunk_size, &plan),
        PlanFormat::Json => {
            let report = PlanReport {
                store: store.name(),
                replication_factor: store.replication_factor(),
                num_nodes: cluster.num_nodes(),
                input_bytes,
                chunk_size_bytes: chunk_size,
                num_chunks_per_node: plan.num_chunks_per_node,
                total_parallelism: plan.total_parallelism,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to render plan")?
            );
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn run_checksum(args: &CliArgs, output: &Path, checksum_args: &ChecksumArgs) -> Result<ExitCode> {
    let options = checksum_args
        .to_options()
        .context("Invalid configuration")?;

    let checksums = aggregate_all(&LocalFileSystem::new(), output, &options)
        .context("Checksum failed")?;

    if !args.quiet {
        print_checksums(&checksums);
    }
    Ok(ExitCode::SUCCESS)
}

fn run_verify(args: &CliArgs, output: &Path, checksum_args: &ChecksumArgs) -> Result<ExitCode> {
    let options = checksum_args
        .to_options()
        .context("Invalid configuration")?;

    let results =
        verify_all(&LocalFileSystem::new(), output, &options).context("Verification failed")?;

    let failed = if args.quiet {
        results.iter().filter(|(_, v)| !v.is_match()).count()
    } else {
        print_verification(&results)
    };

    if failed > 0 {
        warn!(failed, nodes = results.len(), "Checksum verification failed");
        return Ok(ExitCode::FAILURE);
    }
    info!(nodes = results.len(), "All node checksums match");
    Ok(ExitCode::SUCCESS)
}

fn setup_logging(verbose: bool, quiet: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("readonly_store_builder=debug,warn")
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        EnvFilter::new("readonly_store_builder=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
