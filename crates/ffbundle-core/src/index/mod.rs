//! Entry index
//!
//! Maps file names to their region of the data file. An index is built in
//! one of two ways:
//!
//! - **bulk**: parsed once from an index file with [`EntryIndex::load`]
//!   (read-only and read-write bundles)
//! - **incremental**: started empty with [`EntryIndex::new`] and grown with
//!   [`EntryIndex::add`] as writes happen
//!
//! Both paths expose the same lookup contract. Read-only bundles hold their
//! index by value and never mutate it; read-write bundles keep theirs behind
//! a lock and add to it on every write.

pub mod codec;

use crate::entry::Entry;
use crate::{BundleError, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

pub use codec::EntryReader;

/// In-memory name to region mapping for one bundle.
#[derive(Debug, Clone, Default)]
pub struct EntryIndex {
    /// Entries in insertion (or file) order
    entries: Vec<Entry>,
    /// Position of each name in `entries`
    positions: HashMap<String, usize>,
    /// Largest `offset + length` seen, including shadowed lines
    end: u64,
}

impl EntryIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from parsed entries in file order.
    ///
    /// A name that occurs more than once (possible after writing duplicates
    /// in write-only mode) resolves to its last occurrence but keeps the
    /// position of its first one.
    pub fn from_entries(entries: impl IntoIterator<Item = Entry>) -> Self {
        let iter = entries.into_iter();
        let mut index = Self {
            entries: Vec::with_capacity(iter.size_hint().0),
            positions: HashMap::with_capacity(iter.size_hint().0),
            end: 0,
        };

        for entry in iter {
            index.end = index.end.max(entry.end());
            if let Some(&position) = index.positions.get(&entry.name) {
                warn!(
                    "Index lists '{}' more than once, using the entry at offset {}",
                    entry.name, entry.offset
                );
                index.entries[position] = entry;
            } else {
                index.positions.insert(entry.name.clone(), index.entries.len());
                index.entries.push(entry);
            }
        }

        index
    }

    /// Parse an index file.
    ///
    /// Any malformed line fails the whole load; partial indexes are never
    /// returned.
    pub fn load(path: &Path) -> Result<Self> {
        let index = Self::from_entries(codec::read_index_file(path)?);

        debug!(
            "Loaded {} entries from {} (data end {})",
            index.len(),
            path.display(),
            index.end
        );
        Ok(index)
    }

    /// Look up the entry registered under `name`.
    pub fn lookup(&self, name: &str) -> Option<&Entry> {
        self.positions.get(name).map(|&position| &self.entries[position])
    }

    /// Look up `(offset, length)` for `name`.
    pub fn location(&self, name: &str) -> Option<(u64, u64)> {
        self.lookup(name).map(|entry| (entry.offset, entry.length))
    }

    /// Check if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Register a new entry.
    ///
    /// Fails with [`BundleError::DuplicateName`] if the name is taken. On
    /// success the entry is visible to lookups immediately.
    pub fn add(&mut self, entry: Entry) -> Result<()> {
        if self.positions.contains_key(&entry.name) {
            return Err(BundleError::DuplicateName(entry.name));
        }

        self.end = self.end.max(entry.end());
        self.positions.insert(entry.name.clone(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    /// All registered names, in insertion (or file) order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    /// All registered entries, in insertion (or file) order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Number of registered names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First free data offset: `max(offset + length)` over every entry seen.
    pub const fn end(&self) -> u64 {
        self.end
    }

    /// Sum of the stored lengths of all registered entries.
    pub fn live_bytes(&self) -> u64 {
        self.entries.iter().map(|entry| entry.length).sum()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_incremental_add_and_lookup() {
        let mut index = EntryIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.lookup("a"), None);

        index.add(Entry::new("a", 0, 3)).expect("first add");
        index.add(Entry::new("b", 3, 4)).expect("second add");

        assert_eq!(index.len(), 2);
        assert!(index.contains("a"));
        assert_eq!(index.location("b"), Some((3, 4)));
        assert_eq!(index.end(), 7);
        assert_eq!(index.names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_add_rejects_duplicates() {
        let mut index = EntryIndex::new();
        index.add(Entry::new("a", 0, 3)).expect("first add");

        let err = index
            .add(Entry::new("a", 3, 5))
            .expect_err("duplicate should fail");
        assert!(err.is_duplicate());
        assert_eq!(index.location("a"), Some((0, 3)));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_bulk_duplicates_resolve_to_last() {
        let index = EntryIndex::from_entries(vec![
            Entry::new("a", 0, 3),
            Entry::new("b", 3, 4),
            Entry::new("a", 7, 5),
        ]);

        assert_eq!(index.len(), 2);
        assert_eq!(index.location("a"), Some((7, 5)));
        assert_eq!(index.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(index.end(), 12);
    }

    #[test]
    fn test_end_is_maximum_over_unsorted_entries() {
        let index = EntryIndex::from_entries(vec![
            Entry::new("z", 10, 4),
            Entry::new("a", 0, 3),
        ]);
        assert_eq!(index.end(), 14);
        assert_eq!(index.live_bytes(), 7);
    }

    #[test]
    fn test_load_keeps_file_order() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("test.ffindex");
        std::fs::write(&path, "foo\t0\t11\nc\t11\t4\nb\t15\t4\na\t19\t3\n").expect("write index");

        let index = EntryIndex::load(&path).expect("load");
        assert_eq!(
            index.names().collect::<Vec<_>>(),
            vec!["foo", "c", "b", "a"]
        );
        assert_eq!(index.end(), 22);
    }

    #[test]
    fn test_load_fails_on_malformed_line() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("test.ffindex");
        std::fs::write(&path, "a\t0\t3\nbroken line\n").expect("write index");

        let err = EntryIndex::load(&path).expect_err("malformed index");
        assert!(matches!(
            err,
            BundleError::MalformedIndexLine { line: 2, .. }
        ));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempdir().expect("Failed to create temp dir");
        let err = EntryIndex::load(&dir.path().join("missing.ffindex")).expect_err("missing");
        assert!(matches!(err, BundleError::Io(_)));
    }
}
