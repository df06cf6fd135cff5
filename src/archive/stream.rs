//! Pull-based byte stream over one archive entry

use std::io::{self, Read};
use std::sync::Arc;

use log::debug;

use super::error::ArchiveError;

/// Read-only archive that can open several entries at once.
///
/// Every call to [`Archive::open_entry`] must hand out an independent
/// reader; streams never share a cursor.
pub trait Archive {
    type Entry: Read;

    /// Open `path` for reading, returning the reader and the uncompressed size
    fn open_entry(&self, path: &str) -> Result<(Self::Entry, u64), ArchiveError>;
}

/// One archive entry exposed as a byte source for a streaming consumer.
///
/// Single reader: the stream is driven by `&mut self` only. After
/// [`abort`](Self::abort) every read yields zero bytes.
pub struct ArchiveEntryStream<A: Archive> {
    archive: Arc<A>,
    entry_path: String,
    entry: Option<A::Entry>,
    cursor: u64,
    size: u64,
    aborted: bool,
}

impl<A: Archive> std::fmt::Debug for ArchiveEntryStream<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveEntryStream")
            .field("entry_path", &self.entry_path)
            .field("cursor", &self.cursor)
            .field("size", &self.size)
            .field("aborted", &self.aborted)
            .field("entry_open", &self.entry.is_some())
            .finish_non_exhaustive()
    }
}

impl<A: Archive> ArchiveEntryStream<A> {
    pub fn open(archive: Arc<A>, entry_path: impl Into<String>) -> Result<Self, ArchiveError> {
        let entry_path = entry_path.into();
        let (entry, size) = archive.open_entry(&entry_path)?;
        debug!("Opened archive entry {entry_path} ({size} bytes)");

        Ok(Self {
            archive,
            entry_path,
            entry: Some(entry),
            cursor: 0,
            size,
            aborted: false,
        })
    }

    pub fn entry_path(&self) -> &str {
        &self.entry_path
    }

    /// The archive this stream reads from
    pub fn archive(&self) -> &Arc<A> {
        &self.archive
    }

    /// Bytes consumed so far
    pub fn position(&self) -> u64 {
        self.cursor
    }

    /// Uncompressed entry size
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Bytes left to read; zero once aborted or exhausted
    pub fn bytes_available(&self) -> u64 {
        if self.aborted || self.entry.is_none() {
            return 0;
        }
        self.size.saturating_sub(self.cursor)
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// True once the entry has been read to its end
    pub fn is_finished(&self) -> bool {
        !self.aborted && self.entry.is_none()
    }

    /// Read up to `buf.len()` bytes, returning how many were consumed.
    ///
    /// Returns 0 at end of entry and after an abort. The entry handle is
    /// released as soon as the end is reached.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, ArchiveError> {
        if self.aborted || buf.is_empty() {
            return Ok(0);
        }
        let Some(entry) = self.entry.as_mut() else {
            return Ok(0);
        };

        let n = entry.read(buf)?;
        if n == 0 {
            debug!(
                "Finished archive entry {} after {} bytes",
                self.entry_path, self.cursor
            );
            self.entry = None;
        }
        self.cursor += n as u64;
        Ok(n)
    }

    /// Read everything that is left. Unlike [`read`](Self::read), an
    /// aborted stream reports [`ArchiveError::StreamAborted`].
    pub fn read_to_end_checked(&mut self) -> Result<Vec<u8>, ArchiveError> {
        if self.aborted {
            return Err(ArchiveError::StreamAborted(self.entry_path.clone()));
        }

        let mut out = Vec::with_capacity(self.bytes_available().min(1 << 20) as usize);
        let mut chunk = [0u8; 8192];
        loop {
            let n = ArchiveEntryStream::read(self, &mut chunk)?;
            if n == 0 {
                break;
            }
            out.extend_from_slice(&chunk[..n]);
        }
        Ok(out)
    }

    /// Stop the stream and release the entry. Repeated calls do nothing.
    pub fn abort(&mut self) {
        if self.aborted {
            return;
        }
        self.aborted = true;
        self.entry = None;
        debug!(
            "Aborted archive entry {} at {} of {} bytes",
            self.entry_path, self.cursor, self.size
        );
    }
}

impl<A: Archive> Read for ArchiveEntryStream<A> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        ArchiveEntryStream::read(self, buf).map_err(|e| match e {
            ArchiveError::Io(io) => io,
            other => io::Error::other(other),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::rc::Rc;

    /// Entry reader that counts how many readers are alive
    struct TrackedReader {
        inner: Cursor<Vec<u8>>,
        live: Rc<Cell<usize>>,
    }

    impl Read for TrackedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Drop for TrackedReader {
        fn drop(&mut self) {
            self.live.set(self.live.get() - 1);
        }
    }

    struct MemoryArchive {
        files: HashMap<String, Vec<u8>>,
        live: Rc<Cell<usize>>,
    }

    impl MemoryArchive {
        fn new(files: &[(&str, &[u8])]) -> Self {
            Self {
                files: files
                    .iter()
                    .map(|(name, data)| (name.to_string(), data.to_vec()))
                    .collect(),
                live: Rc::new(Cell::new(0)),
            }
        }
    }

    impl Archive for MemoryArchive {
        type Entry = TrackedReader;

        fn open_entry(&self, path: &str) -> Result<(TrackedReader, u64), ArchiveError> {
            let data = self
                .files
                .get(path)
                .ok_or_else(|| ArchiveError::EntryNotFound(path.to_string()))?;
            self.live.set(self.live.get() + 1);
            Ok((
                TrackedReader {
                    inner: Cursor::new(data.clone()),
                    live: Rc::clone(&self.live),
                },
                data.len() as u64,
            ))
        }
    }

    fn archive() -> Arc<MemoryArchive> {
        Arc::new(MemoryArchive::new(&[
            ("OEBPS/chapter1.xhtml", b"<html>chapter one</html>"),
            ("OEBPS/style.css", b"body { margin: 0 }"),
        ]))
    }

    #[test]
    fn test_reads_in_chunks_and_tracks_availability() {
        let mut stream = ArchiveEntryStream::open(archive(), "OEBPS/chapter1.xhtml").unwrap();
        assert_eq!(stream.bytes_available(), 24);

        let mut buf = [0u8; 10];
        assert_eq!(stream.read(&mut buf).unwrap(), 10);
        assert_eq!(&buf, b"<html>chap");
        assert_eq!(stream.bytes_available(), 14);

        let rest = stream.read_to_end_checked().unwrap();
        assert_eq!(rest, b"ter one</html>");
        assert!(stream.is_finished());
        assert_eq!(stream.bytes_available(), 0);
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_abort_stops_reads_and_releases_entry() {
        let archive = archive();
        let mut stream = ArchiveEntryStream::open(Arc::clone(&archive), "OEBPS/style.css").unwrap();
        assert_eq!(archive.live.get(), 1);

        stream.abort();
        assert_eq!(archive.live.get(), 0);

        let mut buf = [0u8; 4];
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
        assert_eq!(stream.bytes_available(), 0);
        assert!(stream.is_aborted());
        assert!(!stream.is_finished());

        stream.abort();
        assert_eq!(archive.live.get(), 0);
        assert!(matches!(
            stream.read_to_end_checked(),
            Err(ArchiveError::StreamAborted(path)) if path == "OEBPS/style.css"
        ));
    }

    #[test]
    fn test_missing_entry() {
        let err = ArchiveEntryStream::open(archive(), "OEBPS/missing.png").unwrap_err();
        assert!(matches!(err, ArchiveError::EntryNotFound(_)));
    }

    #[test]
    fn test_streams_have_independent_cursors() {
        let archive = archive();
        let mut a = ArchiveEntryStream::open(Arc::clone(&archive), "OEBPS/chapter1.xhtml").unwrap();
        let mut b = ArchiveEntryStream::open(Arc::clone(&archive), "OEBPS/chapter1.xhtml").unwrap();

        let mut buf = [0u8; 6];
        a.read(&mut buf).unwrap();
        a.abort();

        let mut other = [0u8; 6];
        assert_eq!(b.read(&mut other).unwrap(), 6);
        assert_eq!(&other, b"<html>");
        assert_eq!(b.position(), 6);
    }

    #[test]
    fn test_io_read_adapter() {
        let mut stream = ArchiveEntryStream::open(archive(), "OEBPS/style.css").unwrap();
        let mut text = String::new();
        io::Read::read_to_string(&mut stream, &mut text).unwrap();
        assert_eq!(text, "body { margin: 0 }");
    }
}
