//! Append path shared by the writable modes
//!
//! A [`BundleWriter`] owns the index append handle and the data appender.
//! Callers hold it behind the bundle's write lock, so the index line and the
//! payload of one write are never interleaved with another write.

use crate::config::BundleConfig;
use crate::data::{self, DataAppender};
use crate::entry::Entry;
use crate::index::codec;
use crate::maintenance;
use crate::{BundleError, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Create the data and index files if they are missing.
///
/// Existing files are left untouched. With `create_missing` disabled a
/// missing file is reported as an I/O error.
pub(crate) fn ensure_files(config: &BundleConfig) -> Result<()> {
    for path in [&config.data_path, &config.index_path] {
        if path.exists() {
            continue;
        }
        if !config.create_missing {
            return Err(BundleError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("bundle file does not exist: {}", path.display()),
            )));
        }
        debug!("Creating bundle file {}", path.display());
        OpenOptions::new().create(true).append(true).open(path)?;
    }
    Ok(())
}

fn open_index_append(path: &Path, capacity: usize) -> Result<BufWriter<File>> {
    Ok(BufWriter::with_capacity(capacity, codec::open_for_append(path)?))
}

/// Index and data append handles plus the write cursor.
pub(crate) struct BundleWriter {
    index_path: PathBuf,
    index: BufWriter<File>,
    data: DataAppender<BufWriter<File>>,
    buffer_size: usize,
    sync_on_flush: bool,
}

impl BundleWriter {
    /// Open both files for appending, with the data cursor at `cursor`.
    pub(crate) fn open(config: &BundleConfig, cursor: u64) -> Result<Self> {
        let buffer_size = config.write_buffer_size.max(1);
        let index = open_index_append(&config.index_path, buffer_size)?;
        let data_file = data::open_for_append(&config.data_path, cursor, false)?;

        debug!(
            "Opened {} for appending at offset {}",
            config.data_path.display(),
            cursor
        );

        Ok(Self {
            index_path: config.index_path.clone(),
            index,
            data: DataAppender::new(BufWriter::with_capacity(buffer_size, data_file), cursor),
            buffer_size,
            sync_on_flush: config.sync_on_flush,
        })
    }

    /// Offset of the next payload.
    pub(crate) const fn cursor(&self) -> u64 {
        self.data.cursor()
    }

    /// Append the index line, then the payload and sentinel.
    pub(crate) fn append(&mut self, name: &str, payload: &[u8]) -> Result<Entry> {
        let entry = Entry::for_payload(name, self.data.cursor(), payload.len() as u64);
        codec::write_line(&mut self.index, &entry.name, entry.offset, entry.length)?;
        self.data.append(payload)?;
        Ok(entry)
    }

    /// Push buffered bytes to the OS without syncing.
    pub(crate) fn flush_buffers(&mut self) -> Result<()> {
        self.index.flush()?;
        self.data.flush()
    }

    /// Flush, and fsync both files when configured to.
    pub(crate) fn flush(&mut self) -> Result<()> {
        self.flush_buffers()?;
        if self.sync_on_flush {
            self.index.get_ref().sync_all()?;
            self.data.get_ref().get_ref().sync_all()?;
        }
        Ok(())
    }

    /// Rewrite the index file sorted by name.
    ///
    /// The index is replaced by rename, so the append handle is reopened on
    /// the new file afterwards.
    pub(crate) fn sort_index(&mut self) -> Result<()> {
        self.index.flush()?;
        maintenance::sort_index_file(&self.index_path)?;
        self.index = open_index_append(&self.index_path, self.buffer_size)?;
        Ok(())
    }
}
