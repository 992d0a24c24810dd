//! Bundle handles
//!
//! A bundle is opened in exactly one mode, and the handle type decides what
//! can be done with it:
//!
//! | Mode | Type | [`ReadableBundle`] | [`WritableBundle`] | Duplicate names |
//! |------|------|:---:|:---:|------|
//! | read-only | [`ReadOnlyBundle`] | yes | no | n/a |
//! | write-only | [`WriteOnlyBundle`] | no | yes | not detected |
//! | read-write | [`ReadWriteBundle`] | yes | yes | rejected |
//!
//! Writes on one handle are serialized by a per-bundle lock. Nothing
//! coordinates separate handles or processes on the same files.

mod read_only;
mod read_write;
mod write_only;
mod writer;

pub use read_only::ReadOnlyBundle;
pub use read_write::ReadWriteBundle;
pub use write_only::WriteOnlyBundle;

use crate::Result;
use crate::config::BundleConfig;
use crate::entry::Entry;
use crate::region::ByteRegion;
use std::path::Path;

/// Files backing an open bundle.
pub trait Bundle {
    /// Path of the data file.
    fn data_path(&self) -> &Path;

    /// Path of the index file.
    fn index_path(&self) -> &Path;
}

/// Read operations of a bundle.
pub trait ReadableBundle: Bundle {
    /// Read a file by name.
    ///
    /// The returned bytes exclude the sentinel and borrow from the bundle.
    /// Fails with [`BundleError::NotFound`](crate::BundleError::NotFound)
    /// for an unregistered name.
    fn read(&self, name: &str) -> Result<ByteRegion<'_>>;

    /// Index entry registered under `name`.
    fn entry(&self, name: &str) -> Option<Entry>;

    /// Check if a file is part of this bundle.
    fn contains(&self, name: &str) -> bool;

    /// Number of files in this bundle.
    fn count(&self) -> usize;

    /// All registered names.
    ///
    /// Order is index file order, followed by names written through this
    /// handle in write order.
    fn names(&self) -> impl Iterator<Item = String> + '_;

    /// Read a file into an owned buffer.
    fn read_to_vec(&self, name: &str) -> Result<Vec<u8>> {
        Ok(self.read(name)?.to_vec())
    }
}

/// Write operations of a bundle.
pub trait WritableBundle: Bundle {
    /// Append a new file.
    ///
    /// Returns the write cursor after the write, i.e. the offset the next
    /// file will be written at.
    fn write(&self, name: &str, content: impl AsRef<[u8]>) -> Result<u64>;

    /// Rewrite the index file sorted by name.
    ///
    /// Needed before handing the index to tools that binary-search it.
    fn sort_index(&self) -> Result<()>;

    /// Flush buffered writes (and fsync, if configured).
    fn flush(&self) -> Result<()>;

    /// Offset the next write will land at.
    fn cursor(&self) -> u64;
}

/// Entry point choosing the mode a bundle is opened in.
///
/// ```rust,no_run
/// use ffbundle_core::{OpenBundle, ReadableBundle};
///
/// # fn example() -> ffbundle_core::Result<()> {
/// let bundle = OpenBundle::new("pdb.data", "pdb.ffindex").read_only()?;
/// println!("{} files", bundle.count());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct OpenBundle {
    config: BundleConfig,
}

impl OpenBundle {
    /// Prepare to open the given data and index files with default settings.
    pub fn new<D: AsRef<Path>, I: AsRef<Path>>(data_path: D, index_path: I) -> Self {
        Self::with_config(BundleConfig::new(data_path, index_path))
    }

    /// Prepare to open a bundle described by `config`.
    pub const fn with_config(config: BundleConfig) -> Self {
        Self { config }
    }

    /// Configuration the bundle will be opened with.
    pub const fn config(&self) -> &BundleConfig {
        &self.config
    }

    /// Open for reading only. Both files must exist.
    pub fn read_only(self) -> Result<ReadOnlyBundle> {
        ReadOnlyBundle::open(self.config)
    }

    /// Open for appending only, creating missing files.
    pub fn write_only(self) -> Result<WriteOnlyBundle> {
        WriteOnlyBundle::open(self.config)
    }

    /// Open for reading and appending, creating missing files.
    pub fn read_write(self) -> Result<ReadWriteBundle> {
        ReadWriteBundle::open(self.config)
    }
}
