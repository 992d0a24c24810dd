//! Offline bundle maintenance
//!
//! These functions work on bundle files by path. They take no locks: the
//! caller must make sure no bundle handle is open on the same files while
//! they run.
//!
//! Every rewrite goes through a sibling temporary file that is fsynced and
//! then renamed over the original, so an interrupted run leaves either the
//! old or the new file in place, never a truncated one.

use crate::data::{self, DataMap};
use crate::entry::Entry;
use crate::index::{EntryIndex, codec};
use crate::{BundleError, Result, SENTINEL};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, info};

/// Sort an index file by name.
///
/// The ordering is byte-wise and stable; offsets and lengths are kept as
/// they are. Sorting a sorted file produces identical bytes.
pub fn sort_index_file(index_path: &Path) -> Result<()> {
    let mut entries = codec::read_index_file(index_path)?;
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    codec::write_index_file(index_path, &entries)?;

    debug!("Sorted {} ({} lines)", index_path.display(), entries.len());
    Ok(())
}

/// Remove the index lines of the given names.
///
/// The data file is not touched; the regions of removed entries stay on disk
/// until [`compact`] runs. Names that are not present are ignored. Returns
/// the number of lines removed.
pub fn unlink<S: AsRef<str>>(index_path: &Path, names: &[S]) -> Result<usize> {
    if names.is_empty() {
        return Ok(0);
    }

    let doomed: HashSet<&str> = names.iter().map(AsRef::as_ref).collect();
    let entries = codec::read_index_file(index_path)?;
    let before = entries.len();
    let kept: Vec<Entry> = entries
        .into_iter()
        .filter(|entry| !doomed.contains(entry.name.as_str()))
        .collect();
    let removed = before - kept.len();

    if removed > 0 {
        codec::write_index_file(index_path, &kept)?;
    }

    info!("Unlinked {} entries from {}", removed, index_path.display());
    Ok(removed)
}

/// Result of a [`compact`] run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompactionStats {
    /// Entries carried over
    pub entries: usize,
    /// Data file size before compaction
    pub old_size: u64,
    /// Data file size after compaction
    pub new_size: u64,
}

impl CompactionStats {
    /// Bytes freed by the compaction.
    pub const fn reclaimed(&self) -> u64 {
        self.old_size.saturating_sub(self.new_size)
    }
}

/// Rewrite the data file so it holds only the regions the index references.
///
/// Entries are copied in ascending offset order with their stored length
/// unchanged, and the index is rewritten in that order with the new offsets.
/// If the index lists a name more than once, only the entry a reader would
/// see is kept.
pub fn compact(data_path: &Path, index_path: &Path) -> Result<CompactionStats> {
    let index = EntryIndex::load(index_path)?;
    let mut entries = index.entries().to_vec();
    entries.sort_by_key(|entry| entry.offset);

    let mut source = File::open(data_path)?;
    let old_size = source.metadata()?.len();
    for entry in &entries {
        data::check_bounds(entry, old_size)?;
    }

    let temp_data = codec::temp_path_for(data_path);
    let temp_index = codec::temp_path_for(index_path);

    let result = copy_regions(&mut source, &entries, &temp_data).and_then(|moved| {
        codec::write_entries(&temp_index, &moved)?;
        std::fs::rename(&temp_data, data_path)?;
        std::fs::rename(&temp_index, index_path)?;
        Ok(moved)
    });

    if result.is_err() {
        let _ = std::fs::remove_file(&temp_data);
        let _ = std::fs::remove_file(&temp_index);
    }
    let moved = result?;

    let stats = CompactionStats {
        entries: moved.len(),
        old_size,
        new_size: codec::entries_end(&moved),
    };

    info!(
        "Compacted {}: {} entries, {} -> {} bytes ({} reclaimed)",
        data_path.display(),
        stats.entries,
        stats.old_size,
        stats.new_size,
        stats.reclaimed()
    );
    Ok(stats)
}

/// Copy each entry's stored bytes into a fresh file, back to back.
///
/// Returns the entries with their offsets in the new file.
fn copy_regions(source: &mut File, entries: &[Entry], target: &Path) -> Result<Vec<Entry>> {
    let file = File::create(target)?;
    let mut out = BufWriter::new(&file);
    let mut moved = Vec::with_capacity(entries.len());
    let mut cursor = 0u64;

    for entry in entries {
        source.seek(SeekFrom::Start(entry.offset))?;
        let copied = io::copy(&mut (&mut *source).take(entry.length), &mut out)?;
        if copied != entry.length {
            return Err(BundleError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "data file ended inside '{}' ({} of {} bytes)",
                    entry.name, copied, entry.length
                ),
            )));
        }

        moved.push(Entry::new(entry.name.clone(), cursor, entry.length));
        cursor += entry.length;
    }

    out.flush()?;
    drop(out);
    file.sync_all()?;
    Ok(moved)
}

/// Result of a [`merge`] run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    /// Entries appended to the first bundle
    pub entries: usize,
    /// Offset the second bundle's data now starts at
    pub base: u64,
    /// Bytes appended to the first data file
    pub bytes_appended: u64,
}

/// Append a second bundle onto the first.
///
/// Every entry of the second bundle is re-registered in the first index with
/// its offset shifted by `base`, the first bundle's end of data. Fails with
/// [`BundleError::MergeConflict`] before modifying anything if the bundles
/// share a name, or with [`BundleError::OffsetOverflow`] if a shifted entry
/// would end past `u64::MAX`. The second bundle's files are only read.
///
/// The first data file is written from `base` on, so bytes past the last
/// indexed region (left by an interrupted write) are overwritten.
pub fn merge(
    data_path: &Path,
    index_path: &Path,
    other_data_path: &Path,
    other_index_path: &Path,
) -> Result<MergeStats> {
    let ours = codec::read_index_file(index_path)?;
    let theirs = codec::read_index_file(other_index_path)?;

    let our_names: HashSet<&str> = ours.iter().map(|entry| entry.name.as_str()).collect();
    let mut conflicts: Vec<String> = theirs
        .iter()
        .filter(|entry| our_names.contains(entry.name.as_str()))
        .map(|entry| entry.name.clone())
        .collect();
    if !conflicts.is_empty() {
        conflicts.sort();
        conflicts.dedup();
        return Err(BundleError::MergeConflict { names: conflicts });
    }

    let base = codec::entries_end(&ours);
    let shifted = theirs
        .iter()
        .map(|entry| {
            entry.shifted(base).ok_or_else(|| BundleError::OffsetOverflow {
                name: entry.name.clone(),
                offset: entry.offset,
                length: entry.length,
                delta: base,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut source = File::open(other_data_path)?;

    let mut target = data::open_for_append(data_path, base, false)?;
    let bytes_appended = io::copy(&mut source, &mut target)?;
    target.set_len(base + bytes_appended)?;
    target.sync_all()?;

    let file = codec::open_for_append(index_path)?;
    let mut out = BufWriter::new(&file);
    for entry in &shifted {
        codec::write_line(&mut out, &entry.name, entry.offset, entry.length)?;
    }
    out.flush()?;
    drop(out);
    file.sync_all()?;

    let stats = MergeStats {
        entries: shifted.len(),
        base,
        bytes_appended,
    };

    info!(
        "Merged {} entries from {} into {} at offset {}",
        stats.entries,
        other_index_path.display(),
        index_path.display(),
        base
    );
    Ok(stats)
}

/// Summary of a bundle's files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BundleStats {
    /// Distinct names in the index
    pub entries: usize,
    /// Lines in the index file (more than `entries` if names repeat)
    pub index_lines: usize,
    /// Sum of stored lengths of the live entries
    pub live_bytes: u64,
    /// Size of the data file
    pub data_size: u64,
    /// Bytes [`compact`] would free
    pub reclaimable_bytes: u64,
    /// Whether the index lines are in name order
    pub sorted: bool,
}

/// Gather [`BundleStats`] for a bundle.
pub fn inspect(data_path: &Path, index_path: &Path) -> Result<BundleStats> {
    let lines = codec::read_index_file(index_path)?;
    let sorted = lines.windows(2).all(|pair| pair[0].name <= pair[1].name);
    let index_lines = lines.len();
    let index = EntryIndex::from_entries(lines);

    let data_size = std::fs::metadata(data_path)?.len();
    let live_bytes = index.live_bytes();

    Ok(BundleStats {
        entries: index.len(),
        index_lines,
        live_bytes,
        data_size,
        reclaimable_bytes: data_size.saturating_sub(live_bytes),
        sorted,
    })
}

/// A consistency problem found by [`verify`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Problem {
    /// The entry's region runs past the end of the data file
    OutOfBounds {
        /// Entry name
        name: String,
        /// End of the region
        end: u64,
        /// Data file size
        size: u64,
    },
    /// The entry's region does not end with the sentinel
    MissingSentinel {
        /// Entry name
        name: String,
        /// Offset of the region
        offset: u64,
    },
    /// Two entries share bytes of the data file
    Overlap {
        /// Entry starting first
        first: String,
        /// Entry starting inside `first`
        second: String,
    },
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds { name, end, size } => {
                write!(f, "'{name}' ends at {end}, past the data file size {size}")
            }
            Self::MissingSentinel { name, offset } => {
                write!(f, "'{name}' at {offset} is not terminated by the sentinel")
            }
            Self::Overlap { first, second } => {
                write!(f, "'{second}' overlaps '{first}'")
            }
        }
    }
}

/// Result of a [`verify`] run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    /// Live entries checked
    pub entries_checked: usize,
    /// Every problem found
    pub problems: Vec<Problem>,
}

impl VerifyReport {
    /// Whether no problems were found.
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Check every live entry of a bundle against its data file.
///
/// Reports entries out of bounds, entries not ending with the sentinel and
/// overlapping entries. Problems are collected, not returned as errors; only
/// an unreadable file or a malformed index fails the call.
pub fn verify(data_path: &Path, index_path: &Path) -> Result<VerifyReport> {
    let index = EntryIndex::load(index_path)?;
    let data = DataMap::new(&File::open(data_path)?)?;
    let mut problems = Vec::new();

    let mut entries: Vec<&Entry> = index.entries().iter().collect();
    entries.sort_by_key(|entry| (entry.offset, entry.end()));

    let mut furthest: Option<&Entry> = None;
    for &entry in &entries {
        match data.stored(entry) {
            Ok(stored) if !stored.ends_with(SENTINEL) => {
                problems.push(Problem::MissingSentinel {
                    name: entry.name.clone(),
                    offset: entry.offset,
                });
            }
            Ok(_) => {}
            Err(_) => problems.push(Problem::OutOfBounds {
                name: entry.name.clone(),
                end: entry.end(),
                size: data.size(),
            }),
        }

        if let Some(previous) = furthest
            && previous.overlaps(entry)
        {
            problems.push(Problem::Overlap {
                first: previous.name.clone(),
                second: entry.name.clone(),
            });
        }
        if furthest.is_none_or(|previous| entry.end() > previous.end()) {
            furthest = Some(entry);
        }
    }

    debug!(
        "Verified {}: {} entries, {} problems",
        index_path.display(),
        entries.len(),
        problems.len()
    );

    Ok(VerifyReport {
        entries_checked: entries.len(),
        problems,
    })
}
