//! Read-only bundles

use super::{Bundle, ReadableBundle};
use crate::config::BundleConfig;
use crate::data::DataMap;
use crate::entry::Entry;
use crate::index::EntryIndex;
use crate::region::ByteRegion;
use crate::{BundleError, Result};
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// A bundle that supports only read operations.
///
/// The index is parsed once at open and the data file is mapped in full;
/// reads return slices of that mapping.
pub struct ReadOnlyBundle {
    config: BundleConfig,
    index: EntryIndex,
    data: DataMap,
}

impl ReadOnlyBundle {
    pub(crate) fn open(config: BundleConfig) -> Result<Self> {
        let file = File::open(&config.data_path)?;
        let index = EntryIndex::load(&config.index_path)?;
        let data = DataMap::new(&file)?;

        debug!(
            "Opened {} read-only: {} entries, {} data bytes",
            config.index_path.display(),
            index.len(),
            data.size()
        );

        Ok(Self {
            config,
            index,
            data,
        })
    }

    /// The parsed index.
    pub const fn index(&self) -> &EntryIndex {
        &self.index
    }

    /// Release the mapping.
    pub fn close(self) -> Result<()> {
        drop(self);
        Ok(())
    }
}

impl Bundle for ReadOnlyBundle {
    fn data_path(&self) -> &Path {
        &self.config.data_path
    }

    fn index_path(&self) -> &Path {
        &self.config.index_path
    }
}

impl ReadableBundle for ReadOnlyBundle {
    fn read(&self, name: &str) -> Result<ByteRegion<'_>> {
        let entry = self
            .index
            .lookup(name)
            .ok_or_else(|| BundleError::NotFound(name.to_string()))?;
        Ok(ByteRegion::borrowed(self.data.payload(entry)?))
    }

    fn entry(&self, name: &str) -> Option<Entry> {
        self.index.lookup(name).cloned()
    }

    fn contains(&self, name: &str) -> bool {
        self.index.contains(name)
    }

    fn count(&self) -> usize {
        self.index.len()
    }

    fn names(&self) -> impl Iterator<Item = String> + '_ {
        self.index.names().map(str::to_owned)
    }
}
