//! Flat-file bundles of many small named files.
//!
//! A bundle is a pair of files:
//!
//! - a **data file** holding every payload back to back, each followed by a
//!   two byte sentinel (`\n\0`)
//! - an **index file**, one `name<TAB>offset<TAB>length` line per entry,
//!   where `length` includes the sentinel
//!
//! Millions of small files can be stored this way without paying the
//! filesystem's per-file overhead, and any of them can be read back through
//! a memory mapping without copying.
//!
//! Bundles are opened in one of three modes through [`OpenBundle`]:
//!
//! - **read-only**: lookups and zero-copy reads
//! - **write-only**: buffered appends, no duplicate detection, no read-back
//! - **read-write**: appends plus reads, duplicate names rejected
//!
//! Space used by removed entries is reclaimed offline with the functions in
//! [`maintenance`].
//!
//! # Example
//!
//! ```rust,no_run
//! use ffbundle_core::{OpenBundle, ReadableBundle, WritableBundle};
//!
//! # fn example() -> ffbundle_core::Result<()> {
//! let bundle = OpenBundle::new("files.data", "files.ffindex").read_write()?;
//! bundle.write("docs/readme.txt", b"hello")?;
//!
//! let content = bundle.read("docs/readme.txt")?;
//! assert_eq!(&*content, b"hello");
//! drop(content);
//!
//! bundle.close()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

use std::path::PathBuf;
use thiserror::Error;

// Bundle handles and mode selection
pub mod bundle;

// Configuration
pub mod config;

// Data file access
pub mod data;

// Index entries
pub mod entry;

// Entry index and index file codec
pub mod index;

// Offline maintenance (sort, unlink, compact, merge)
pub mod maintenance;

// Directory packing
pub mod pack;

// Zero-copy read results
pub mod region;

pub use bundle::{
    Bundle, OpenBundle, ReadOnlyBundle, ReadWriteBundle, ReadableBundle, WritableBundle,
    WriteOnlyBundle,
};
pub use config::BundleConfig;
pub use entry::Entry;
pub use index::EntryIndex;
pub use region::ByteRegion;

/// Result type for bundle operations.
pub type Result<T> = std::result::Result<T, BundleError>;

/// Errors that can occur during bundle operations.
#[derive(Debug, Error)]
pub enum BundleError {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No entry with this name is registered.
    #[error("No file with name '{0}'")]
    NotFound(String),

    /// An entry with this name is already registered.
    #[error("File '{0}' already exists - write to a new name to update existing content")]
    DuplicateName(String),

    /// An index line could not be parsed.
    #[error("Malformed index line {line}: {reason}")]
    MalformedIndexLine {
        /// 1-based line number in the index file
        line: usize,
        /// What was wrong with the line
        reason: String,
    },

    /// Two bundles being merged share at least one name.
    #[error("Merge conflict: {} name(s) present in both bundles (first: '{}')", names.len(), names.first().map_or("", String::as_str))]
    MergeConflict {
        /// Every colliding name, sorted
        names: Vec<String>,
    },

    /// An entry points past the end of the data file.
    #[error("Entry '{name}' at {offset}+{length} exceeds data file size {size}")]
    OutOfBounds {
        /// Entry name
        name: String,
        /// Recorded offset
        offset: u64,
        /// Recorded length
        length: u64,
        /// Size of the data file
        size: u64,
    },

    /// Moving an entry would put its region past the largest representable offset.
    #[error("Entry '{name}' at {offset}+{length} cannot be moved by {delta} bytes")]
    OffsetOverflow {
        /// Entry name
        name: String,
        /// Offset before the move
        offset: u64,
        /// Recorded length
        length: u64,
        /// Requested shift
        delta: u64,
    },

    /// The name cannot be represented in the index format.
    #[error("Invalid file name {0:?}: names must be non-empty and free of tab and line breaks")]
    InvalidName(String),

    /// A file found while packing a directory cannot be added.
    #[error("Cannot pack {}: {reason}", path.display())]
    Pack {
        /// Path of the offending file
        path: PathBuf,
        /// Why it was rejected
        reason: String,
    },
}

impl BundleError {
    /// Whether this error means the requested name is not registered.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether this error means the name is already registered.
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateName(_))
    }
}

/// Version information for the bundle library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Terminator appended after every payload in the data file.
///
/// Makes a dump of the data file look line-delimited. It is counted in each
/// entry's recorded length and stripped from every read.
pub const SENTINEL: &[u8; 2] = b"\n\0";

/// Length of [`SENTINEL`] in bytes.
pub const SENTINEL_LEN: u64 = SENTINEL.len() as u64;

/// Field delimiter within an index line.
pub const INDEX_DELIMITER: char = '\t';

/// Conventional extension of the data file.
pub const DATA_EXTENSION: &str = "data";

/// Conventional extension of the index file.
pub const INDEX_EXTENSION: &str = "ffindex";
