//! Write-only bundles

use super::writer::{BundleWriter, ensure_files};
use super::{Bundle, WritableBundle};
use crate::config::BundleConfig;
use crate::index::codec;
use crate::Result;
use parking_lot::Mutex;
use std::path::Path;
use tracing::{debug, trace, warn};

/// A bundle that supports only append operations.
///
/// No in-memory index is kept, so opening is cheap even for very large
/// bundles and a name written twice is not detected: both index lines end
/// up in the index file, and readers opening it later resolve the name to
/// the last one.
///
/// Writes are buffered and reach the files on [`flush`](WritableBundle::flush),
/// [`sort_index`](WritableBundle::sort_index), [`close`](Self::close) or drop.
pub struct WriteOnlyBundle {
    config: BundleConfig,
    writer: Mutex<BundleWriter>,
}

impl WriteOnlyBundle {
    pub(crate) fn open(config: BundleConfig) -> Result<Self> {
        ensure_files(&config)?;

        // Resume after the furthest region any existing line points at.
        let cursor = codec::scan_end(&config.index_path)?;
        let writer = BundleWriter::open(&config, cursor)?;

        debug!(
            "Opened {} write-only, cursor at {}",
            config.index_path.display(),
            cursor
        );

        Ok(Self {
            config,
            writer: Mutex::new(writer),
        })
    }

    /// Flush everything written so far and release the files.
    pub fn close(self) -> Result<()> {
        self.writer.lock().flush()
    }
}

impl Bundle for WriteOnlyBundle {
    fn data_path(&self) -> &Path {
        &self.config.data_path
    }

    fn index_path(&self) -> &Path {
        &self.config.index_path
    }
}

impl WritableBundle for WriteOnlyBundle {
    fn write(&self, name: &str, content: impl AsRef<[u8]>) -> Result<u64> {
        codec::validate_name(name)?;
        let payload = content.as_ref();

        let mut writer = self.writer.lock();
        let entry = writer.append(name, payload)?;
        trace!("Wrote '{}' at {} ({} bytes)", name, entry.offset, entry.length);
        Ok(writer.cursor())
    }

    fn sort_index(&self) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.flush_buffers()?;
        writer.sort_index()
    }

    fn flush(&self) -> Result<()> {
        self.writer.lock().flush()
    }

    fn cursor(&self) -> u64 {
        self.writer.lock().cursor()
    }
}

impl Drop for WriteOnlyBundle {
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
