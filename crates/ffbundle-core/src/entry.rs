//! Index entries
//!
//! An [`Entry`] names one region of the data file. The recorded `length`
//! covers the payload and its trailing sentinel.

use crate::SENTINEL_LEN;
use std::fmt;
use std::ops::Range;

/// One named region of the data file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entry {
    /// File name, unique within a bundle
    pub name: String,
    /// Byte position of the payload in the data file
    pub offset: u64,
    /// Stored length including the sentinel
    pub length: u64,
}

impl Entry {
    /// Create a new entry.
    pub fn new(name: impl Into<String>, offset: u64, length: u64) -> Self {
        Self {
            name: name.into(),
            offset,
            length,
        }
    }

    /// Entry for a payload of `payload_len` bytes written at `offset`.
    pub fn for_payload(name: impl Into<String>, offset: u64, payload_len: u64) -> Self {
        Self::new(name, offset, payload_len + SENTINEL_LEN)
    }

    /// Length of the payload without the sentinel.
    pub const fn payload_len(&self) -> u64 {
        self.length.saturating_sub(SENTINEL_LEN)
    }

    /// First byte past this entry (payload and sentinel).
    pub const fn end(&self) -> u64 {
        self.offset + self.length
    }

    /// Byte range of the payload in the data file.
    pub const fn payload_range(&self) -> Range<u64> {
        self.offset..self.offset + self.payload_len()
    }

    /// Byte range of the whole stored region, sentinel included.
    pub const fn stored_range(&self) -> Range<u64> {
        self.offset..self.end()
    }

    /// Check if the stored regions of two entries overlap.
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }

    /// Copy of this entry moved by `delta` bytes.
    ///
    /// `None` if the moved region would end past `u64::MAX`.
    #[must_use]
    pub fn shifted(&self, delta: u64) -> Option<Self> {
        let offset = self.offset.checked_add(delta)?;
        offset.checked_add(self.length)?;
        Some(Self::new(self.name.clone(), offset, self.length))
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.name, self.offset, self.length)
    }
}
