//! Benchmarks for readonly-store-builder
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn benchmark_chunk_plan(c: &mut Criterion) {
    use readonly_store_builder::compute_chunk_plan;

    c.bench_function("compute_chunk_plan", |b| {
        b.iter(|| {
            let plan = compute_chunk_plan(
                black_box(10 * 1024 * 1024 * 1024 * 1024),
                black_box(3),
                black_box(48),
                black_box(1024 * 1024 * 1024),
            );
            black_box(plan);
        })
    });
}

fn benchmark_checksum_order(c: &mut Criterion) {
    use readonly_store_builder::checksum::{digest_inputs, ChecksumOrder, MANIFEST_FILE_NAME};
    use readonly_store_builder::fs::FileStatus;

    let entries: Vec<FileStatus> = (0..1000)
        .flat_map(|i| {
            [
                FileStatus::file(format!("/out/node-0/{}.index", i), 20),
                FileStatus::file(format!("/out/node-0/{}.data", i), 4096),
            ]
        })
        .collect();

    c.bench_function("digest_inputs_2000_listing", |b| {
        b.iter(|| {
            let ordered = digest_inputs(entries.clone(), ChecksumOrder::Listing, MANIFEST_FILE_NAME);
            black_box(ordered);
        })
    });

    c.bench_function("digest_inputs_2000_by_name", |b| {
        b.iter(|| {
            let ordered = digest_inputs(entries.clone(), ChecksumOrder::ByName, MANIFEST_FILE_NAME);
            black_box(ordered);
        })
    });
}

fn benchmark_node_digest(c: &mut Criterion) {
    use readonly_store_builder::checksum::{compute_node_digest, ChecksumOptions};
    use readonly_store_builder::fs::MemoryFileSystem;
    use std::path::Path;

    let fs = MemoryFileSystem::new();
    for chunk in 0..8 {
        fs.add_file(format!("/out/node-0/{}.data", chunk), vec![chunk as u8; 256 * 1024]);
        fs.add_file(format!("/out/node-0/{}.index", chunk), vec![chunk as u8; 4 * 1024]);
    }
    let options = ChecksumOptions::default();

    c.bench_function("node_digest_8_chunks_2mb", |b| {
        b.iter(|| {
            let checksum = compute_node_digest(&fs, Path::new("/out/node-0"), &options).unwrap();
            black_box(checksum);
        })
    });
}

criterion_group!(
    benches,
    benchmark_chunk_plan,
    benchmark_checksum_order,
    benchmark_node_digest
);
criterion_main!(benches);
