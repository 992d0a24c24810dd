//! Zero-copy read results
//!
//! A [`ByteRegion`] is a read-only view of one payload. It either borrows
//! from a mapping owned by the bundle or owns a mapping of just that
//! payload; in both cases it carries the bundle's lifetime, so it cannot be
//! used once the bundle is closed.

use memmap2::Mmap;
use std::fmt;
use std::io::Cursor;
use std::marker::PhantomData;
use std::ops::Deref;

/// Read-only bytes of one bundle entry, sentinel stripped.
pub struct ByteRegion<'a> {
    inner: Inner<'a>,
}

enum Inner<'a> {
    /// Slice of a whole-file mapping held by the bundle
    Borrowed(&'a [u8]),
    /// Mapping of exactly this payload
    Mapped(Mmap, PhantomData<&'a ()>),
}

impl<'a> ByteRegion<'a> {
    pub(crate) const fn borrowed(bytes: &'a [u8]) -> Self {
        Self {
            inner: Inner::Borrowed(bytes),
        }
    }

    pub(crate) const fn mapped(map: Mmap) -> Self {
        Self {
            inner: Inner::Mapped(map, PhantomData),
        }
    }

    /// The payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.inner {
            Inner::Borrowed(bytes) => *bytes,
            Inner::Mapped(map, _) => &map[..],
        }
    }

    /// The payload as UTF-8 text.
    pub fn as_str(&self) -> std::result::Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(self.as_bytes())
    }

    /// A `Read + Seek` view over the payload.
    pub fn reader(&self) -> Cursor<&[u8]> {
        Cursor::new(self.as_bytes())
    }

    /// Whether the bytes come from a mapping created for this read alone.
    pub const fn is_dedicated_mapping(&self) -> bool {
        matches!(self.inner, Inner::Mapped(..))
    }
}

impl Deref for ByteRegion<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl AsRef<[u8]> for ByteRegion<'_> {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl PartialEq<[u8]> for ByteRegion<'_> {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_bytes() == other
    }
}

impl fmt::Debug for ByteRegion<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteRegion")
            .field("len", &self.len())
            .field("dedicated_mapping", &self.is_dedicated_mapping())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_borrowed_region_views() {
        let data = b"fooo\nfooo".to_vec();
        let region = ByteRegion::borrowed(&data);

        assert_eq!(region.len(), 9);
        assert_eq!(region.as_str(), Ok("fooo\nfooo"));
        assert!(region == *b"fooo\nfooo".as_slice());
        assert!(!region.is_dedicated_mapping());

        let mut out = String::new();
        region
            .reader()
            .read_to_string(&mut out)
            .expect("read from cursor");
        assert_eq!(out, "fooo\nfooo");
    }

    #[test]
    fn test_empty_region() {
        let region = ByteRegion::borrowed(&[]);
        assert!(region.is_empty());
        assert_eq!(region.as_str(), Ok(""));
    }
}
