//! Write and read throughput of bundles.
//!
//! Run with:
//! ```bash
//! cargo bench --bench bundle
//! ```

#![allow(clippy::expect_used)]

use criterion::{
    BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main,
};
use ffbundle_core::{OpenBundle, ReadWriteBundle, ReadableBundle, WritableBundle};
use std::hint::black_box;
use tempfile::TempDir;

const FILE_COUNT: usize = 2_000;

fn payload(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

/// Bundle holding `FILE_COUNT` files of `size` bytes each.
fn populated(size: usize) -> (TempDir, ReadWriteBundle) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let bundle = OpenBundle::new(dir.path().join("b.data"), dir.path().join("b.ffindex"))
        .read_write()
        .expect("open bundle");
    let content = payload(size);
    for i in 0..FILE_COUNT {
        bundle.write(&format!("file/{i:06}"), &content).expect("write");
    }
    (dir, bundle)
}

fn bench_writes(c: &mut Criterion) {
    let mut group = c.benchmark_group("write");

    for size in [64usize, 4096] {
        let content = payload(size);
        group.throughput(Throughput::Bytes((size * FILE_COUNT) as u64));

        group.bench_with_input(BenchmarkId::new("write_only", size), &content, |b, content| {
            b.iter_batched(
                || TempDir::new().expect("Failed to create temp dir"),
                |dir| {
                    let bundle =
                        OpenBundle::new(dir.path().join("b.data"), dir.path().join("b.ffindex"))
                            .write_only()
                            .expect("open bundle");
                    for i in 0..FILE_COUNT {
                        bundle.write(&format!("file/{i:06}"), content).expect("write");
                    }
                    bundle.close().expect("close");
                },
                BatchSize::PerIteration,
            );
        });

        group.bench_with_input(BenchmarkId::new("read_write", size), &content, |b, content| {
            b.iter_batched(
                || TempDir::new().expect("Failed to create temp dir"),
                |dir| {
                    let bundle =
                        OpenBundle::new(dir.path().join("b.data"), dir.path().join("b.ffindex"))
                            .read_write()
                            .expect("open bundle");
                    for i in 0..FILE_COUNT {
                        bundle.write(&format!("file/{i:06}"), content).expect("write");
                    }
                    bundle.close().expect("close");
                },
                BatchSize::PerIteration,
            );
        });
    }

    group.finish();
}

fn bench_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("read");

    for size in [64usize, 4096] {
        let (dir, bundle) = populated(size);
        bundle.close().expect("close");
        let reader = OpenBundle::new(dir.path().join("b.data"), dir.path().join("b.ffindex"))
            .read_only()
            .expect("open read-only");
        let names: Vec<String> = reader.names().collect();

        group.throughput(Throughput::Elements(FILE_COUNT as u64));

        group.bench_function(BenchmarkId::new("sequential", size), |b| {
            b.iter(|| {
                for name in &names {
                    black_box(reader.read(name).expect("read").len());
                }
            });
        });

        // Fixed stride through the names, coprime with FILE_COUNT, so every
        // name is visited once in a scattered order.
        group.bench_function(BenchmarkId::new("scattered", size), |b| {
            b.iter(|| {
                let mut i = 0;
                for _ in 0..FILE_COUNT {
                    i = (i + 997) % FILE_COUNT;
                    black_box(reader.read(&names[i]).expect("read").len());
                }
            });
        });

        let (_rw_dir, rw) = populated(size);
        group.bench_function(BenchmarkId::new("read_write_mapped", size), |b| {
            b.iter(|| {
                for name in &names {
                    black_box(rw.read(name).expect("read").len());
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_writes, bench_reads);
criterion_main!(benches);
