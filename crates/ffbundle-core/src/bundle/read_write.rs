//! Read-write bundles

use super::writer::{BundleWriter, ensure_files};
use super::{Bundle, ReadableBundle, WritableBundle};
use crate::config::BundleConfig;
use crate::data;
use crate::entry::Entry;
use crate::index::{EntryIndex, codec};
use crate::region::ByteRegion;
use crate::{BundleError, Result};
use parking_lot::{Mutex, RwLock};
use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace, warn};

/// A bundle that supports reads and appends.
///
/// The index file is parsed at open and kept in memory; every successful
/// write is added to it, so a file is readable as soon as `write` returns.
/// Writing a name that is already registered fails with
/// [`BundleError::DuplicateName`] and leaves both files untouched.
///
/// Writes are serialized by an internal lock. Reads take only a short shared
/// lock for the lookup and may run concurrently with each other and with a
/// write in progress.
pub struct ReadWriteBundle {
    config: BundleConfig,
    /// Read handle used for mapping payloads
    data: File,
    /// Bytes known to be on disk in the data file
    data_size: AtomicU64,
    index: RwLock<EntryIndex>,
    writer: Mutex<BundleWriter>,
}

impl ReadWriteBundle {
    pub(crate) fn open(config: BundleConfig) -> Result<Self> {
        ensure_files(&config)?;

        let index = EntryIndex::load(&config.index_path)?;
        let cursor = index.end();
        let writer = BundleWriter::open(&config, cursor)?;
        let data = File::open(&config.data_path)?;
        let data_size = data.metadata()?.len();

        debug!(
            "Opened {} read-write: {} entries, cursor at {}",
            config.index_path.display(),
            index.len(),
            cursor
        );

        Ok(Self {
            config,
            data,
            data_size: AtomicU64::new(data_size),
            index: RwLock::new(index),
            writer: Mutex::new(writer),
        })
    }

    /// Copy of the in-memory index.
    pub fn snapshot(&self) -> EntryIndex {
        self.index.read().clone()
    }

    /// Flush everything written so far and release the files.
    pub fn close(self) -> Result<()> {
        self.writer.lock().flush()
    }
}

impl Bundle for ReadWriteBundle {
    fn data_path(&self) -> &Path {
        &self.config.data_path
    }

    fn index_path(&self) -> &Path {
        &self.config.index_path
    }
}

impl ReadableBundle for ReadWriteBundle {
    fn read(&self, name: &str) -> Result<ByteRegion<'_>> {
        let entry = self
            .entry(name)
            .ok_or_else(|| BundleError::NotFound(name.to_string()))?;
        data::map_payload(&self.data, &entry, self.data_size.load(Ordering::Acquire))
    }

    fn entry(&self, name: &str) -> Option<Entry> {
        self.index.read().lookup(name).cloned()
    }

    fn contains(&self, name: &str) -> bool {
        self.index.read().contains(name)
    }

    fn count(&self) -> usize {
        self.index.read().len()
    }

    fn names(&self) -> impl Iterator<Item = String> + '_ {
        let names: Vec<String> = self.index.read().names().map(str::to_owned).collect();
        names.into_iter()
    }
}

impl WritableBundle for ReadWriteBundle {
    fn write(&self, name: &str, content: impl AsRef<[u8]>) -> Result<u64> {
        codec::validate_name(name)?;
        let payload = content.as_ref();

        let mut writer = self.writer.lock();
        // Only writers add names and they are serialized by `writer`, so the
        // name cannot be taken between this check and the add below.
        if self.index.read().contains(name) {
            return Err(BundleError::DuplicateName(name.to_string()));
        }

        let entry = writer.append(name, payload)?;
        writer.flush_buffers()?;
        self.data_size.fetch_max(entry.end(), Ordering::AcqRel);

        trace!("Wrote '{}' at {} ({} bytes)", name, entry.offset, entry.length);
        self.index.write().add(entry)?;
        Ok(writer.cursor())
    }

    fn sort_index(&self) -> Result<()> {
        self.writer.lock().sort_index()
    }

    fn flush(&self) -> Result<()> {
        self.writer.lock().flush()
    }

    fn cursor(&self) -> u64 {
        self.writer.lock().cursor()
    }
}

impl Drop for ReadWriteBundle {
    fn drop(&mut self) {
        if let Err(e) = self.writer.get_mut().flush_buffers() {
            warn!(
                "Failed to flush {} on drop: {}",
                self.config.index_path.display(),
                e
            );
        }
    }
}
