//! Single-process job engine
//!
//! Runs a build job in three sequential phases:
//!
//! 1. **Map**: every non-hidden input file is read line by line, each line
//!    goes through the job's transform and lands in the bucket chosen by
//!    the partitioner.
//! 2. **Spill**: each bucket is written to `temp/map-output/part-NNNNN`.
//! 3. **Reduce**: each spill is read back, sorted by key and written as a
//!    data/index pair into `output/node-<id>/`.
//!
//! Every partition produces a chunk, even if it received no records, so
//! each node directory always holds `num_chunks` pairs.

use super::{
    ChunkWriter, JobEngine, JobSpec, KeyValue, PartitionStrategy, RecordError, RecordTransform,
};
use crate::error::{EngineError, EngineResult};
use crate::fs::{FileStatus, FileSystem};
use md5::{Digest as _, Md5};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Directory under the temp path holding map output
pub const MAP_OUTPUT_DIR: &str = "map-output";

/// Counters from one local run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalRunStats {
    pub input_files: u64,
    pub records_in: u64,
    pub records_out: u64,
    pub chunks_written: u64,
}

/// Sequential engine over a [`FileSystem`]
#[derive(Debug, Default)]
pub struct LocalEngine<F> {
    fs: F,
}

impl<F: FileSystem> LocalEngine<F> {
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    /// Run a job and report what it did
    pub fn run_with_stats(&self, job: &JobSpec) -> EngineResult<LocalRunStats> {
        let start = Instant::now();
        if job.num_reduce_tasks == 0 || job.num_chunks == 0 {
            return Err(EngineError::Failed {
                reason: "job has no reduce partitions".to_string(),
            });
        }

        info!(
            job_id = %job.id,
            input = %job.input_path.display(),
            partitions = job.num_reduce_tasks,
            "Starting local job"
        );

        let mut stats = LocalRunStats::default();

        // Map
        let mut buckets: Vec<Vec<KeyValue>> = vec![Vec::new(); job.num_reduce_tasks as usize];
        for file in input_files(&self.fs, &job.input_path)? {
            stats.input_files += 1;
            self.map_file(job, &file, &mut buckets, &mut stats)?;
        }

        // Spill
        let spill_dir = job.temp_path.join(MAP_OUTPUT_DIR);
        self.fs.create_dir_all(&spill_dir)?;
        for (partition, bucket) in buckets.into_iter().enumerate() {
            let path = spill_path(&spill_dir, partition as u32);
            let mut out = BufWriter::with_capacity(job.buffer_size, self.fs.create(&path)?);
            for record in &bucket {
                write_record(&mut out, record)?;
            }
            out.flush()?;
        }

        // Reduce
        for partition in 0..job.num_reduce_tasks {
            let chunk = job
                .chunk_for_partition(partition)
                .ok_or_else(|| EngineError::Failed {
                    reason: format!("partition {} has no node", partition),
                })?;

            let mut records = {
                let reader = self.fs.open(&spill_path(&spill_dir, partition))?;
                read_records(BufReader::with_capacity(job.buffer_size, reader))?
            };
            records.sort_by(|a, b| a.key.cmp(&b.key));

            let mut data = BufWriter::with_capacity(
                job.buffer_size,
                self.fs.create(&chunk.data_path(&job.output_path))?,
            );
            let mut index = BufWriter::with_capacity(
                job.buffer_size,
                self.fs.create(&chunk.index_path(&job.output_path))?,
            );
            job.writer.write_chunk(&records, &mut data, &mut index)?;
            data.flush()?;
            index.flush()?;

            debug!(chunk = %chunk, records = records.len(), "Wrote chunk");
            stats.records_out += records.len() as u64;
            stats.chunks_written += 1;
        }

        info!(
            job_id = %job.id,
            files = stats.input_files,
            records = stats.records_out,
            chunks = stats.chunks_written,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Local job complete"
        );

        Ok(stats)
    }

    fn map_file(
        &self,
        job: &JobSpec,
        file: &Path,
        buckets: &mut [Vec<KeyValue>],
        stats: &mut LocalRunStats,
    ) -> EngineResult<()> {
        let mut reader = BufReader::with_capacity(job.buffer_size, self.fs.open(file)?);
        let mut line = Vec::new();
        let mut line_no = 0u64;

        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            line_no += 1;

            let record = trim_line_end(&line);
            if record.is_empty() {
                continue;
            }
            stats.records_in += 1;

            let mapped = job
                .transform
                .transform(record)
                .map_err(|e| EngineError::Transform {
                    path: file.to_path_buf(),
                    record: line_no,
                    reason: e.0,
                })?;

            if let Some(kv) = mapped {
                let partition = job.partitioner.partition(&kv.key, job.num_reduce_tasks);
                let bucket = buckets.get_mut(partition as usize).ok_or_else(|| {
                    EngineError::Failed {
                        reason: format!(
                            "partitioner '{}' returned {} for {} partitions",
                            job.partitioner.name(),
                            partition,
                            job.num_reduce_tasks
                        ),
                    }
                })?;
                bucket.push(kv);
            }
        }

        Ok(())
    }
}

impl<F: FileSystem> JobEngine for LocalEngine<F> {
    fn name(&self) -> &str {
        "local"
    }

    fn run(&self, job: &JobSpec) -> EngineResult<()> {
        self.run_with_stats(job).map(|_| ())
    }
}

/// Input files under `root`, in listing order.
///
/// Entries starting with `.` or `_` are skipped, as are their subtrees.
fn input_files<F: FileSystem + ?Sized>(fs: &F, root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries = fs.list_status(&dir)?;
        // Push in reverse so directories are visited in listing order
        let mut subdirs = Vec::new();
        for entry in entries {
            if is_ignored(&entry) {
                continue;
            }
            if entry.is_dir {
                subdirs.push(entry.path);
            } else {
                files.push(entry.path);
            }
        }
        stack.extend(subdirs.into_iter().rev());
    }

    Ok(files)
}

fn is_ignored(entry: &FileStatus) -> bool {
    entry.is_hidden() || entry.name().starts_with('_')
}

fn spill_path(dir: &Path, partition: u32) -> PathBuf {
    dir.join(format!("part-{:05}", partition))
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn write_frame(out: &mut dyn Write, bytes: &[u8]) -> io::Result<()> {
    let len = u32::try_from(bytes.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "record field too large"))?;
    out.write_all(&len.to_be_bytes())?;
    out.write_all(bytes)
}

fn write_record(out: &mut dyn Write, record: &KeyValue) -> io::Result<()> {
    write_frame(out, &record.key)?;
    write_frame(out, &record.value)
}

/// Read one length-prefixed frame, `None` at a clean end of stream
fn read_frame<R: Read>(reader: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut len = [0u8; 4];
    let mut filled = 0;
    while filled < len.len() {
        let n = reader.read(&mut len[filled..])?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "truncated frame header",
            ));
        }
        filled += n;
    }

    let mut bytes = vec![0u8; u32::from_be_bytes(len) as usize];
    reader.read_exact(&mut bytes)?;
    Ok(Some(bytes))
}

/// Read length-prefixed key/value records until end of stream
pub fn read_records<R: Read>(mut reader: R) -> io::Result<Vec<KeyValue>> {
    let mut records = Vec::new();
    while let Some(key) = read_frame(&mut reader)? {
        let value = read_frame(&mut reader)?.ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "record without value")
        })?;
        records.push(KeyValue { key, value });
    }
    Ok(records)
}

/// Splits `key<TAB>value` lines at the first tab
#[derive(Debug, Clone, Copy, Default)]
pub struct TabSeparatedTransform;

impl RecordTransform for TabSeparatedTransform {
    fn name(&self) -> &str {
        "tab-separated"
    }

    fn transform(&self, record: &[u8]) -> Result<Option<KeyValue>, RecordError> {
        match record.iter().position(|&b| b == b'\t') {
            Some(at) => Ok(Some(KeyValue::new(&record[..at], &record[at + 1..]))),
            None => Err(RecordError("missing tab separator".to_string())),
        }
    }
}

/// Routes keys by the first four bytes of their MD5
#[derive(Debug, Clone, Copy, Default)]
pub struct HashPartitioner;

impl PartitionStrategy for HashPartitioner {
    fn name(&self) -> &str {
        "md5-hash"
    }

    fn partition(&self, key: &[u8], num_partitions: u32) -> u32 {
        let digest = Md5::digest(key);
        let prefix = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
        prefix % num_partitions.max(1)
    }
}

/// Width of one index entry: key MD5 plus data file offset
pub const INDEX_ENTRY_LEN: usize = 16 + 4;

/// Length-prefixed data file plus a fixed-width index.
///
/// ```text
/// data:  [u32 key len][key][u32 value len][value] ...
/// index: [md5(key); 16][u32 data offset]      ...
/// ```
///
/// All integers are big-endian.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryChunkWriter;

impl ChunkWriter for BinaryChunkWriter {
    fn name(&self) -> &str {
        "binary"
    }

    fn write_chunk(
        &self,
        records: &[KeyValue],
        data: &mut dyn Write,
        index: &mut dyn Write,
    ) -> io::Result<()> {
        let mut offset: u64 = 0;
        for record in records {
            let position = u32::try_from(offset).map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidData, "data file exceeds 4 GiB")
            })?;
            index.write_all(&Md5::digest(&record.key))?;
            index.write_all(&position.to_be_bytes())?;

            write_record(data, record)?;
            offset += 8 + record.key.len() as u64 + record.value.len() as u64;
        }
        Ok(())
    }
}
