//! Quick read throughput measurement on an existing bundle

use anyhow::{Context, Result, bail};
use ffbundle_core::{OpenBundle, ReadableBundle};
use serde::Serialize;
use std::hint::black_box;
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// Outcome of a `bench` run
#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    pub files: usize,
    pub reads: usize,
    pub bytes: u64,
    pub open_ms: f64,
    pub read_ms: f64,
    pub reads_per_sec: f64,
    pub mib_per_sec: f64,
}

/// Step through `len` items in a fixed scattered order.
///
/// Uses a stride coprime with `len`, so every item is visited once per
/// `len` steps.
fn stride_for(len: usize) -> usize {
    const fn gcd(mut a: usize, mut b: usize) -> usize {
        while b != 0 {
            let rest = a % b;
            a = b;
            b = rest;
        }
        a
    }

    let mut stride = (len / 2) | 1;
    while len > 1 && gcd(stride, len) != 1 {
        stride += 2;
    }
    stride
}

/// Open a bundle read-only and perform `reads` lookups and reads.
pub fn measure(data: &Path, index: &Path, reads: usize) -> Result<BenchReport> {
    let started = Instant::now();
    let bundle = OpenBundle::new(data, index)
        .read_only()
        .with_context(|| format!("Failed to open {}", data.display()))?;
    let open_elapsed = started.elapsed();

    let names: Vec<String> = bundle.names().collect();
    if names.is_empty() {
        bail!("bundle is empty, nothing to read");
    }

    let stride = stride_for(names.len());
    debug!("Reading {} times with stride {}", reads, stride);

    let started = Instant::now();
    let mut bytes = 0u64;
    let mut position = 0;
    for _ in 0..reads {
        position = (position + stride) % names.len();
        let content = bundle.read(&names[position])?;
        bytes += black_box(content.len()) as u64;
    }
    let read_elapsed = started.elapsed();

    let seconds = read_elapsed.as_secs_f64().max(f64::EPSILON);
    Ok(BenchReport {
        files: names.len(),
        reads,
        bytes,
        open_ms: open_elapsed.as_secs_f64() * 1000.0,
        read_ms: read_elapsed.as_secs_f64() * 1000.0,
        reads_per_sec: reads as f64 / seconds,
        mib_per_sec: bytes as f64 / seconds / (1024.0 * 1024.0),
    })
}

/// `ffbundle bench [--reads N] [--json]`
pub fn run(data: &Path, index: &Path, reads: usize, json: bool, out: &mut impl Write) -> Result<()> {
    let report = measure(data, index, reads)?;

    if json {
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "Opened {} files in {:.2} ms", report.files, report.open_ms)?;
    writeln!(
        out,
        "{} reads ({} bytes) in {:.2} ms: {:.0} reads/s, {:.2} MiB/s",
        report.reads, report.bytes, report.read_ms, report.reads_per_sec, report.mib_per_sec
    )?;
    Ok(())
}
