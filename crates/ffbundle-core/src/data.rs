//! Data file access
//!
//! Reads go through memory mappings: either one mapping of the whole file
//! ([`DataMap`], for files that no longer change) or one mapping per read
//! ([`map_payload`], for files still being appended to).
//!
//! Writes go through a [`DataAppender`], which tracks the write cursor and
//! terminates every payload with the sentinel.

use crate::entry::Entry;
use crate::region::ByteRegion;
use crate::{BundleError, Result, SENTINEL, SENTINEL_LEN};
use memmap2::{Mmap, MmapOptions};
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::ops::Range;
use std::path::Path;
use tracing::{debug, trace};

/// Reject entries whose stored region runs past the end of the data file.
///
/// Touching a mapped page beyond end of file faults, so every read checks
/// this before mapping.
pub fn check_bounds(entry: &Entry, size: u64) -> Result<()> {
    if entry.end() > size {
        return Err(BundleError::OutOfBounds {
            name: entry.name.clone(),
            offset: entry.offset,
            length: entry.length,
            size,
        });
    }
    Ok(())
}

/// Whole-file read-only mapping of a data file.
pub struct DataMap {
    /// `None` for an empty file, which cannot be mapped
    mmap: Option<Mmap>,
    size: u64,
}

impl DataMap {
    /// Map an open data file in full.
    pub fn new(file: &File) -> Result<Self> {
        let size = file.metadata()?.len();

        let mmap = if size == 0 {
            None
        } else {
            // The file is opened read-only and never truncated while the
            // bundle is open.
            #[allow(unsafe_code)]
            let mmap = unsafe { MmapOptions::new().map(file)? };
            Some(mmap)
        };

        debug!("Mapped data file ({} bytes)", size);
        Ok(Self { mmap, size })
    }

    /// Size of the mapped file.
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Payload bytes of `entry`, sentinel excluded.
    pub fn payload(&self, entry: &Entry) -> Result<&[u8]> {
        check_bounds(entry, self.size)?;
        Ok(self.slice(entry.payload_range()))
    }

    /// Stored bytes of `entry`, sentinel included.
    pub fn stored(&self, entry: &Entry) -> Result<&[u8]> {
        check_bounds(entry, self.size)?;
        Ok(self.slice(entry.stored_range()))
    }

    fn slice(&self, range: Range<u64>) -> &[u8] {
        match &self.mmap {
            Some(mmap) => &mmap[range.start as usize..range.end as usize],
            None => &[],
        }
    }
}

/// Map exactly the payload of `entry` from a file that may still grow.
///
/// `size` is the caller's known data file size; the entry must lie within it.
pub fn map_payload<'a>(file: &File, entry: &Entry, size: u64) -> Result<ByteRegion<'a>> {
    check_bounds(entry, size)?;

    let len = entry.payload_len();
    if len == 0 {
        return Ok(ByteRegion::borrowed(&[]));
    }

    // The region lies below the write cursor; appends never rewrite it.
    #[allow(unsafe_code)]
    let mmap = unsafe {
        MmapOptions::new()
            .offset(entry.offset)
            .len(len as usize)
            .map(file)?
    };

    Ok(ByteRegion::mapped(mmap))
}

/// Open a data file for appending at `cursor` without truncating it.
pub fn open_for_append(path: &Path, cursor: u64, create: bool) -> Result<File> {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(create)
        .truncate(false)
        .open(path)?;
    file.seek(SeekFrom::Start(cursor))?;
    Ok(file)
}

/// Cursor-tracked sequential writer for payloads.
///
/// Every payload is followed by [`SENTINEL`]. The cursor advances by the
/// number of bytes written, so it always names the offset of the next write.
pub struct DataAppender<W: Write> {
    out: W,
    cursor: u64,
}

impl<W: Write> DataAppender<W> {
    /// Wrap a writer already positioned at `cursor`.
    pub const fn new(out: W, cursor: u64) -> Self {
        Self { out, cursor }
    }

    /// Offset the next payload will be written at.
    pub const fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Append `payload` and the sentinel.
    ///
    /// Returns the offset the payload was written at. A failure part way
    /// through leaves the underlying file ahead of the cursor.
    pub fn append(&mut self, payload: &[u8]) -> Result<u64> {
        let offset = self.cursor;

        self.out.write_all(payload)?;
        self.cursor += payload.len() as u64;
        self.out.write_all(SENTINEL)?;
        self.cursor += SENTINEL_LEN;

        trace!("Appended {} bytes at offset {}", payload.len(), offset);
        Ok(offset)
    }

    /// Flush buffered bytes to the file.
    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    /// Access the underlying writer.
    pub const fn get_ref(&self) -> &W {
        &self.out
    }

    /// Consume the appender, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}
