//! Offline maintenance commands

use anyhow::{Context, Result, bail};
use ffbundle_core::maintenance;
use std::io::Write;
use std::path::Path;

/// `ffbundle sort`
pub fn sort(index: &Path, out: &mut impl Write) -> Result<()> {
    maintenance::sort_index_file(index)
        .with_context(|| format!("Failed to sort {}", index.display()))?;
    writeln!(out, "Sorted {}", index.display())?;
    Ok(())
}

/// `ffbundle unlink <names...>`
pub fn unlink(index: &Path, names: &[String], out: &mut impl Write) -> Result<()> {
    let removed = maintenance::unlink(index, names)
        .with_context(|| format!("Failed to unlink from {}", index.display()))?;
    writeln!(out, "Unlinked {removed} entries")?;
    Ok(())
}

/// `ffbundle compact`
pub fn compact(data: &Path, index: &Path, out: &mut impl Write) -> Result<()> {
    let stats = maintenance::compact(data, index)
        .with_context(|| format!("Failed to compact {}", data.display()))?;
    writeln!(
        out,
        "Compacted {} entries: {} -> {} bytes ({} reclaimed)",
        stats.entries,
        stats.old_size,
        stats.new_size,
        stats.reclaimed()
    )?;
    Ok(())
}

/// `ffbundle merge --other-data <file> --other-index <file>`
pub fn merge(
    data: &Path,
    index: &Path,
    other_data: &Path,
    other_index: &Path,
    out: &mut impl Write,
) -> Result<()> {
    let stats = maintenance::merge(data, index, other_data, other_index)
        .with_context(|| format!("Failed to merge {}", other_index.display()))?;
    writeln!(
        out,
        "Merged {} entries ({} bytes) at offset {}",
        stats.entries, stats.bytes_appended, stats.base
    )?;
    Ok(())
}

/// `ffbundle stats [--json]`
pub fn stats(data: &Path, index: &Path, json: bool, out: &mut impl Write) -> Result<()> {
    let stats = maintenance::inspect(data, index)?;

    if json {
        serde_json::to_writer_pretty(&mut *out, &stats)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "Entries:      {}", stats.entries)?;
    writeln!(out, "Index lines:  {}", stats.index_lines)?;
    writeln!(out, "Live bytes:   {}", stats.live_bytes)?;
    writeln!(out, "Data size:    {}", stats.data_size)?;
    writeln!(out, "Reclaimable:  {}", stats.reclaimable_bytes)?;
    writeln!(out, "Sorted:       {}", if stats.sorted { "yes" } else { "no" })?;
    Ok(())
}

/// `ffbundle verify`
///
/// Prints every problem found and fails if there is at least one.
pub fn verify(data: &Path, index: &Path, out: &mut impl Write) -> Result<()> {
    let report = maintenance::verify(data, index)?;

    for problem in &report.problems {
        writeln!(out, "{problem}")?;
    }
    if !report.is_ok() {
        bail!(
            "{} problem(s) found in {} entries",
            report.problems.len(),
            report.entries_checked
        );
    }

    writeln!(out, "OK: {} entries checked", report.entries_checked)?;
    Ok(())
}
