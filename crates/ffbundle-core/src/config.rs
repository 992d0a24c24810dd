//! Configuration for opening bundles

use crate::{DATA_EXTENSION, INDEX_EXTENSION};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default capacity of the buffered writers used in write-only mode.
pub const DEFAULT_WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Configuration for opening a bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleConfig {
    /// Path of the data file
    pub data_path: PathBuf,

    /// Path of the index file
    pub index_path: PathBuf,

    /// Capacity of buffered writers in write-only mode (in bytes)
    pub write_buffer_size: usize,

    /// Also fsync both files on `flush()` and `close()`
    pub sync_on_flush: bool,

    /// Create missing files when opening in a writable mode
    pub create_missing: bool,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(format!("bundle.{DATA_EXTENSION}")),
            index_path: PathBuf::from(format!("bundle.{INDEX_EXTENSION}")),
            write_buffer_size: DEFAULT_WRITE_BUFFER_SIZE,
            sync_on_flush: false,
            create_missing: true,
        }
    }
}

impl BundleConfig {
    /// Create a configuration for the given data and index files
    pub fn new<D: AsRef<Path>, I: AsRef<Path>>(data_path: D, index_path: I) -> Self {
        Self {
            data_path: data_path.as_ref().to_path_buf(),
            index_path: index_path.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Configuration for a data file and its conventional index file
    ///
    /// The index path is the data path with its extension replaced by
    /// `ffindex`, e.g. `out/proteins.data` pairs with `out/proteins.ffindex`.
    pub fn for_data_file<P: AsRef<Path>>(data_path: P) -> Self {
        let data_path = data_path.as_ref();
        Self::new(data_path, data_path.with_extension(INDEX_EXTENSION))
    }

    /// Set the write buffer size
    #[must_use]
    pub const fn with_write_buffer_size(mut self, size: usize) -> Self {
        self.write_buffer_size = size;
        self
    }

    /// Enable or disable fsync on flush
    #[must_use]
    pub const fn with_sync_on_flush(mut self, enable: bool) -> Self {
        self.sync_on_flush = enable;
        self
    }

    /// Enable or disable creation of missing files
    #[must_use]
    pub const fn with_create_missing(mut self, enable: bool) -> Self {
        self.create_missing = enable;
        self
    }
}
