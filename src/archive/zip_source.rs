//! Zip-backed [`Archive`]

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Take};
use std::path::{Path, PathBuf};

use crc32fast::Hasher;
use flate2::read::DeflateDecoder;
use log::{debug, warn};
use zip::{CompressionMethod, ZipArchive};

use super::error::ArchiveError;
use super::stream::Archive;

#[derive(Clone, Debug)]
struct EntryLocation {
    data_start: u64,
    compressed_size: u64,
    size: u64,
    crc32: u32,
    method: CompressionMethod,
}

/// Central-directory index of a zip file.
///
/// The directory is read once on open. Each opened entry gets its own file
/// handle, so any number of entries can be streamed at the same time.
#[derive(Debug)]
pub struct ZipArchiveSource {
    path: PathBuf,
    entries: HashMap<String, EntryLocation>,
}

impl ZipArchiveSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ArchiveError::open(path, e))?;
        let mut zip =
            ZipArchive::new(BufReader::new(file)).map_err(|e| ArchiveError::open(path, e))?;

        let mut entries = HashMap::with_capacity(zip.len());
        for i in 0..zip.len() {
            let entry = match zip.by_index(i) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry #{i} in {path:?}: {e}");
                    continue;
                }
            };
            if entry.is_dir() {
                continue;
            }
            entries.insert(
                entry.name().to_string(),
                EntryLocation {
                    data_start: entry.data_start(),
                    compressed_size: entry.compressed_size(),
                    size: entry.size(),
                    crc32: entry.crc32(),
                    method: entry.compression(),
                },
            );
        }

        debug!("Indexed {} entries in {path:?}", entries.len());
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, entry_path: &str) -> bool {
        self.entries.contains_key(entry_path.trim_start_matches('/'))
    }

    /// Entry names, sorted
    pub fn entry_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Archive for ZipArchiveSource {
    type Entry = ZipEntryReader;

    fn open_entry(&self, entry_path: &str) -> Result<(ZipEntryReader, u64), ArchiveError> {
        let name = entry_path.trim_start_matches('/');
        let location = self
            .entries
            .get(name)
            .ok_or_else(|| ArchiveError::EntryNotFound(name.to_string()))?;

        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(location.data_start))?;
        let raw = BufReader::new(file).take(location.compressed_size);

        let data = match location.method {
            CompressionMethod::Stored => EntryData::Stored(raw),
            CompressionMethod::Deflated => EntryData::Deflated(DeflateDecoder::new(raw)),
            other => {
                return Err(ArchiveError::Unsupported {
                    path: name.to_string(),
                    method: format!("{other:?}"),
                });
            }
        };

        let reader = ZipEntryReader {
            data,
            hasher: Hasher::new(),
            expected_crc: location.crc32,
            verified: false,
        };
        Ok((reader, location.size))
    }
}

enum EntryData {
    Stored(Take<BufReader<File>>),
    Deflated(DeflateDecoder<Take<BufReader<File>>>),
}

/// Reader over one zip entry's data.
///
/// The CRC-32 from the central directory is checked when the data runs
/// out; a mismatch surfaces as an `InvalidData` error instead of EOF.
pub struct ZipEntryReader {
    data: EntryData,
    hasher: Hasher,
    expected_crc: u32,
    verified: bool,
}

impl Read for ZipEntryReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = match &mut self.data {
            EntryData::Stored(r) => r.read(buf)?,
            EntryData::Deflated(r) => r.read(buf)?,
        };

        if n > 0 {
            self.hasher.update(&buf[..n]);
        } else if !buf.is_empty() && !self.verified {
            let actual = self.hasher.clone().finalize();
            if actual != self.expected_crc {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "Invalid checksum: expected {:08x}, got {actual:08x}",
                        self.expected_crc
                    ),
                ));
            }
            self.verified = true;
        }
        Ok(n)
    }
}
