//! Spill-then-map backing store for baseline record payloads.
//!
//! The writer appends each joined baseline record to an anonymous temp
//! file (created and immediately unlinked, so no named file outlives the
//! process even on abnormal termination) at a running byte offset. After
//! the whole baseline has been consumed, the file is mapped into memory
//! once and every payload is served as a bounds-checked slice of that one
//! mapping. The mapping must outlive every payload access; it is released
//! only at session teardown.

#![allow(unsafe_code)]

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use memmap2::Mmap;

use crate::core::errors::{FicError, Result};

#[cfg(unix)]
use std::os::fd::AsRawFd;

/// Record terminator byte within the backing file.
const RECORD_TERMINATOR: u8 = 0;

/// Sequential writer phase of the backing store.
#[derive(Debug)]
pub struct BackingWriter {
    writer: BufWriter<File>,
    offset: u64,
}

impl BackingWriter {
    /// Create the anonymous backing file under `dir`.
    ///
    /// The file has no filesystem name from the moment this returns; it
    /// lives exactly as long as the open handle (and later the mapping).
    pub fn create(dir: &Path) -> Result<Self> {
        let file = tempfile::tempfile_in(dir).map_err(|e| FicError::io(dir, e))?;
        Ok(Self {
            writer: BufWriter::new(file),
            offset: 0,
        })
    }

    /// Append one record's bytes plus a terminator; returns the record's
    /// starting offset.
    pub fn append(&mut self, record: &str) -> Result<u64> {
        let start = self.offset;
        self.writer
            .write_all(record.as_bytes())
            .and_then(|()| self.writer.write_all(&[RECORD_TERMINATOR]))
            .map_err(|e| FicError::BackingStore {
                details: format!("write at offset {start}: {e}"),
            })?;
        self.offset += record.len() as u64 + 1;
        Ok(start)
    }

    /// Total bytes written so far, terminators included.
    #[must_use]
    pub const fn bytes_written(&self) -> u64 {
        self.offset
    }

    /// Flush and map the backing file read-only.
    pub fn finish(self) -> Result<MappedStore> {
        let size = self.offset;
        let mut file = self
            .writer
            .into_inner()
            .map_err(|e| FicError::BackingStore {
                details: format!("flush: {e}"),
            })?;
        file.seek(SeekFrom::Start(0)).map_err(|e| FicError::BackingStore {
            details: format!("rewind: {e}"),
        })?;

        // A zero-length mapping is invalid; an empty baseline simply has
        // no mapped region and every payload access is out of bounds.
        if size == 0 {
            return Ok(MappedStore { map: None, size: 0 });
        }

        // SAFETY: the backing file was created anonymously by this process
        // and unlinked from the filesystem namespace at creation, so no
        // other process can open or resize it. All writes happened through
        // the now-consumed writer; nothing mutates the file after this
        // read-only mapping is created.
        let map = unsafe { Mmap::map(&file) }.map_err(|e| FicError::BackingStore {
            details: format!("map ({size} bytes): {e}"),
        })?;
        advise_sequential(&file, &map);

        Ok(MappedStore {
            map: Some(map),
            size,
        })
    }
}

/// Read-only mapped phase of the backing store.
#[derive(Debug)]
pub struct MappedStore {
    map: Option<Mmap>,
    size: u64,
}

impl MappedStore {
    /// Mapped size in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Borrow the record text at `offset` with byte length `len`.
    ///
    /// Bounds-checked slice construction replaces trust in raw offset
    /// arithmetic; a reference outside the mapped region or one that does
    /// not decode as UTF-8 is an internal invariant violation.
    pub fn text(&self, offset: u64, len: u32) -> Result<&str> {
        let bounds_err = || FicError::PayloadBounds {
            offset,
            len: u64::from(len),
            size: self.size,
        };
        let end = offset.checked_add(u64::from(len)).ok_or_else(bounds_err)?;
        if end > self.size {
            return Err(bounds_err());
        }
        let map = self.map.as_ref().ok_or_else(bounds_err)?;
        let start = usize::try_from(offset).map_err(|_| bounds_err())?;
        let end = usize::try_from(end).map_err(|_| bounds_err())?;
        std::str::from_utf8(&map[start..end]).map_err(|_| FicError::PayloadEncoding { offset })
    }
}

/// Hint the OS that the mapping will be read sequentially. Advisory only;
/// failures are ignored.
#[cfg(unix)]
fn advise_sequential(file: &File, map: &Mmap) {
    // SAFETY: advisory calls on a live fd and a live mapping owned by the
    // caller; neither call mutates memory contents.
    unsafe {
        #[cfg(target_os = "linux")]
        let _ = libc::posix_fadvise(file.as_raw_fd(), 0, 0, libc::POSIX_FADV_SEQUENTIAL);
        #[cfg(not(target_os = "linux"))]
        let _ = file;
        let _ = libc::madvise(
            map.as_ptr().cast::<libc::c_void>().cast_mut(),
            map.len(),
            libc::MADV_SEQUENTIAL,
        );
    }
}

#[cfg(not(unix))]
fn advise_sequential(_file: &File, _map: &Mmap) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_returns_running_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = BackingWriter::create(dir.path()).unwrap();
        assert_eq!(writer.append("\"/a\"|10").unwrap(), 0);
        assert_eq!(writer.append("\"/b\"|20").unwrap(), 8);
        assert_eq!(writer.bytes_written(), 16);
    }

    #[test]
    fn finish_maps_written_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = BackingWriter::create(dir.path()).unwrap();
        let first = writer.append("\"/a\"|10").unwrap();
        let second = writer.append("\"/b\"|20|xyz").unwrap();
        let store = writer.finish().unwrap();

        assert_eq!(store.text(first, 7).unwrap(), "\"/a\"|10");
        assert_eq!(store.text(second, 11).unwrap(), "\"/b\"|20|xyz");
    }

    #[test]
    fn empty_store_has_no_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let writer = BackingWriter::create(dir.path()).unwrap();
        let store = writer.finish().unwrap();
        assert_eq!(store.size(), 0);
        let err = store.text(0, 1).unwrap_err();
        assert_eq!(err.code(), "FIC-4003");
    }

    #[test]
    fn out_of_bounds_reference_is_invariant_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = BackingWriter::create(dir.path()).unwrap();
        writer.append("\"/a\"|10").unwrap();
        let store = writer.finish().unwrap();
        let err = store.text(4, 32).unwrap_err();
        assert_eq!(err.code(), "FIC-4003");
    }
}
