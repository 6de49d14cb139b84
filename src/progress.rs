//! Progress reporting and summaries for the CLI
//!
//! A spinner runs while a long step is in flight; summaries are printed
//! with console styling once it finishes.

use crate::builder::BuildSummary;
use crate::checksum::{to_hex, NodeChecksum, Verification};
use crate::plan::ChunkPlan;
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Spinner showing the current build step
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        let spinner = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        bar.set_style(spinner);
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Create a reporter that draws nothing (quiet mode)
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Finish and clear the progress display
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| {
            chunk
                .iter()
                .rev()
                .map(|&b| b as char)
                .collect::<String>()
        })
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a header at the start of a command
pub fn print_header(command: &str, fields: &[(&str, String)]) {
    println!();
    println!(
        "{} {} {}",
        style("readonly-store-builder").cyan().bold(),
        env!("CARGO_PKG_VERSION"),
        style(command).dim()
    );
    println!("{}", style("─".repeat(50)).dim());
    for (label, value) in fields {
        println!("  {} {}", style(format!("{}:", label)).bold(), value);
    }
    println!();
}

/// Print a chunk plan
pub fn print_plan(input_bytes: u64, num_nodes: u32, chunk_size: u64, plan: &ChunkPlan) {
    println!("{}", style("Chunk Plan").green().bold());
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {}",
        style("Input Size:").bold(),
        format_size(input_bytes, BINARY)
    );
    println!("  {} {}", style("Nodes:").bold(), num_nodes);
    println!(
        "  {} {}",
        style("Chunk Size:").bold(),
        format_size(chunk_size, BINARY)
    );
    println!(
        "  {} {}",
        style("Chunks/Node:").bold(),
        format_number(plan.num_chunks_per_node as u64)
    );
    println!(
        "  {} {}",
        style("Parallelism:").bold(),
        format_number(plan.total_parallelism as u64)
    );
    println!();
}

/// Print a summary of a finished build
pub fn print_build_summary(summary: &BuildSummary, output: &Path) {
    let duration_secs = summary.duration.as_secs_f64();

    println!();
    println!("{}", style("Build Complete").green().bold());
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Job:").bold(), summary.job_id);
    println!(
        "  {} {}",
        style("Input Size:").bold(),
        format_size(summary.input_bytes, BINARY)
    );
    println!(
        "  {} {} per node, {} total",
        style("Chunks:").bold(),
        format_number(summary.plan.num_chunks_per_node as u64),
        format_number(summary.plan.total_parallelism as u64)
    );
    println!("  {} {:.1}s", style("Duration:").bold(), duration_secs);
    println!("  {} {}", style("Output:").bold(), output.display());
    if !summary.checksums.is_empty() {
        println!();
        print_checksums(&summary.checksums);
    }
    println!();
}

/// Print node checksums, one line per node directory
pub fn print_checksums(checksums: &[NodeChecksum]) {
    println!("{}", style("Checksums").green().bold());
    for checksum in checksums {
        println!(
            "  {}  {} ({} files, {})",
            style(checksum.hex()).cyan(),
            checksum.node_dir.display(),
            format_number(checksum.files.len() as u64),
            format_size(checksum.bytes, BINARY)
        );
    }
}

/// Print verification results. Returns the number of failed nodes.
pub fn print_verification(results: &[(PathBuf, Verification)]) -> usize {
    let mut failed = 0;

    println!("{}", style("Verification").green().bold());
    for (dir, result) in results {
        match result {
            Verification::Match { digest } => {
                println!(
                    "  {}  {} {}",
                    style("OK").green().bold(),
                    dir.display(),
                    style(to_hex(digest)).dim()
                );
            }
            Verification::Mismatch { expected, actual } => {
                failed += 1;
                println!(
                    "  {}  {} expected {} got {}",
                    style("MISMATCH").red().bold(),
                    dir.display(),
                    to_hex(expected),
                    to_hex(actual)
                );
            }
            Verification::Missing { actual } => {
                failed += 1;
                println!(
                    "  {}  {} no manifest (contents {})",
                    style("MISSING").yellow().bold(),
                    dir.display(),
                    to_hex(actual)
                );
            }
        }
    }

    failed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(1234567890), "1,234,567,890");
    }

    #[test]
    fn test_print_verification_counts_failures() {
        let results = vec![
            (PathBuf::from("/o/node-0"), Verification::Match { digest: [0; 16] }),
            (
                PathBuf::from("/o/node-1"),
                Verification::Mismatch {
                    expected: vec![1; 16],
                    actual: [2; 16],
                },
            ),
            (PathBuf::from("/o/node-2"), Verification::Missing { actual: [3; 16] }),
        ];
        assert_eq!(print_verification(&results), 2);
    }
}
