//! Index file codec
//!
//! One line per entry:
//!
//! ```text
//! <name> TAB <offset> TAB <length> LF
//! ```
//!
//! `offset` and `length` are unsigned decimals, `length` includes the
//! sentinel. There is no header, no escaping and no trailing metadata. Lines
//! are written in write order unless the file is explicitly sorted.
//!
//! Parsing is all-or-nothing: the first malformed line fails the whole read.

use crate::entry::Entry;
use crate::{BundleError, INDEX_DELIMITER, Result, SENTINEL_LEN};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Check that a name can be stored in an index line.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains([INDEX_DELIMITER, '\n', '\r']) {
        return Err(BundleError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Parse a single index line (without its terminator).
///
/// `line_no` is 1-based and only used for error reporting.
pub fn parse_line(line: &str, line_no: usize) -> Result<Entry> {
    let malformed = |reason: String| BundleError::MalformedIndexLine {
        line: line_no,
        reason,
    };

    let fields: Vec<&str> = line.split(INDEX_DELIMITER).collect();
    let [name, offset, length] = fields.as_slice() else {
        return Err(malformed(format!(
            "expected 3 tab-separated fields, found {}",
            fields.len()
        )));
    };

    if name.is_empty() {
        return Err(malformed("empty file name".to_string()));
    }

    let offset = offset
        .parse::<u64>()
        .map_err(|e| malformed(format!("invalid offset {offset:?}: {e}")))?;
    let length = length
        .parse::<u64>()
        .map_err(|e| malformed(format!("invalid length {length:?}: {e}")))?;

    if length < SENTINEL_LEN {
        return Err(malformed(format!(
            "length {length} is shorter than the {SENTINEL_LEN} byte sentinel"
        )));
    }

    if offset.checked_add(length).is_none() {
        return Err(malformed(format!(
            "region {offset}+{length} ends past the largest representable offset"
        )));
    }

    Ok(Entry::new(*name, offset, length))
}

/// Append the index line for an entry (terminator included) to `out`.
pub fn write_line<W: Write>(
    out: &mut W,
    name: &str,
    offset: u64,
    length: u64,
) -> std::io::Result<()> {
    writeln!(out, "{name}{INDEX_DELIMITER}{offset}{INDEX_DELIMITER}{length}")
}

/// Streaming reader over the entries of an index.
///
/// Yields entries in file order. Accepts `\n` and `\r\n` terminators and a
/// missing terminator on the last line.
pub struct EntryReader<R> {
    reader: R,
    buf: Vec<u8>,
    line_no: usize,
}

impl<R: BufRead> EntryReader<R> {
    /// Wrap a buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(256),
            line_no: 0,
        }
    }

    fn next_entry(&mut self) -> Result<Option<Entry>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        self.line_no += 1;

        let mut raw = self.buf.as_slice();
        if let Some(stripped) = raw.strip_suffix(b"\n") {
            raw = stripped;
        }
        if let Some(stripped) = raw.strip_suffix(b"\r") {
            raw = stripped;
        }

        let line = std::str::from_utf8(raw).map_err(|e| BundleError::MalformedIndexLine {
            line: self.line_no,
            reason: format!("not valid UTF-8: {e}"),
        })?;

        parse_line(line, self.line_no).map(Some)
    }
}

impl EntryReader<BufReader<File>> {
    /// Open an index file for streaming.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> Iterator for EntryReader<R> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}

/// Parse every entry of an index file, in file order.
pub fn read_index_file(path: &Path) -> Result<Vec<Entry>> {
    let entries = EntryReader::open(path)?.collect::<Result<Vec<_>>>()?;
    debug!("Parsed {} index lines from {}", entries.len(), path.display());
    Ok(entries)
}

/// First free data offset implied by an index file: `max(offset + length)`.
///
/// Streams the file without retaining entries. Returns 0 for an empty index.
pub fn scan_end(path: &Path) -> Result<u64> {
    let mut end = 0;
    for entry in EntryReader::open(path)? {
        end = end.max(entry?.end());
    }
    Ok(end)
}

/// Largest `offset + length` over a slice of entries, 0 if empty.
pub fn entries_end(entries: &[Entry]) -> u64 {
    entries.iter().map(Entry::end).max().unwrap_or(0)
}

/// Sibling path used while rewriting `path`.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Atomically replace an index file with the given entries.
///
/// Writes a sibling temp file, fsyncs it, then renames it over `path`.
pub fn write_index_file(path: &Path, entries: &[Entry]) -> Result<()> {
    let temp_path = temp_path_for(path);

    let result = write_entries(&temp_path, entries).and_then(|()| {
        std::fs::rename(&temp_path, path)?;
        Ok(())
    });

    if result.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    result?;

    debug!("Rewrote {} with {} entries", path.display(), entries.len());
    Ok(())
}

/// Write entries to a fresh file and fsync it.
pub(crate) fn write_entries(path: &Path, entries: &[Entry]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(&file);
    for entry in entries {
        write_line(&mut writer, &entry.name, entry.offset, entry.length)?;
    }
    writer.flush()?;
    drop(writer);
    file.sync_all()?;
    Ok(())
}

/// Open an index file for appending lines.
///
/// An index whose last line lacks its terminator (accepted when parsing) is
/// given one first, so the next line does not run into it.
pub fn open_for_append(path: &Path) -> Result<File> {
    let mut file = OpenOptions::new().read(true).append(true).open(path)?;

    let len = file.metadata()?.len();
    if len > 0 {
        let mut last = [0u8; 1];
        file.seek(SeekFrom::Start(len - 1))?;
        file.read_exact(&mut last)?;
        if last[0] != b'\n' {
            debug!("Terminating last line of {}", path.display());
            file.write_all(b"\n")?;
        }
    }

    Ok(file)
}
