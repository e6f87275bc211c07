//! Snapshot stream reader.
//!
//! Supplies the comparison engine with already-tokenized records: each line
//! of a snapshot file becomes a full-width field array plus a 16-byte
//! identity hash derived from the record's name field. The first line is a
//! header naming the recorded fields; the field mask is derived from it.
//!
//! Malformed records are surfaced as a distinguishable per-record event so
//! the caller can count and skip them. For block/checkpoint-oriented
//! sources, [`SnapshotReader::request_resync`] arms skip-to-next-checkpoint
//! behavior; in this line-oriented reader every line begins a checkpoint,
//! so the flag drains on the next read without discarding records.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::compare::decoder;
use crate::compare::index::RecordHash;
use crate::core::attrs::{ATTR_NAME_INDEX, ATTR_TABLE_LEN, AttrMask, attr_index};
use crate::core::errors::{FicError, Result};

/// Per-stream decode totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Lines read past the header.
    pub analyzed: u64,
    /// Records decoded successfully.
    pub decoded: u64,
    /// Records skipped as malformed.
    pub skipped: u64,
}

/// One successfully decoded snapshot record.
#[derive(Debug, Clone)]
pub struct ParsedRecord {
    /// Origin line number within the snapshot file (header is line 1).
    pub line_number: u64,
    /// Identity hash: first 16 bytes of SHA-256 over the raw name field.
    pub hash: RecordHash,
    /// Full-width field array, one slot per table attribute.
    pub fields: Vec<String>,
}

/// Per-record event from the stream.
#[derive(Debug)]
pub enum RecordEvent {
    /// A decoded record.
    Record(ParsedRecord),
    /// A record that failed to parse and was counted as skipped.
    Malformed {
        /// Line number of the failed record.
        line_number: u64,
        /// What went wrong, for diagnostics.
        details: String,
    },
}

/// Streaming reader over one snapshot file.
#[derive(Debug)]
pub struct SnapshotReader<R> {
    file_name: String,
    reader: R,
    line_number: u64,
    field_mask: AttrMask,
    field_count: usize,
    checkpointed: bool,
    skip_to_checkpoint: bool,
    stats: DecodeStats,
    line: String,
}

impl SnapshotReader<BufReader<File>> {
    /// Open a snapshot file and parse its header.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| FicError::io(path, e))?;
        Self::from_reader(BufReader::new(file), &path.display().to_string())
    }
}

impl<R: BufRead> SnapshotReader<R> {
    /// Wrap any buffered reader; the first line must be the field header.
    pub fn from_reader(reader: R, file_name: &str) -> Result<Self> {
        let mut this = Self {
            file_name: file_name.to_string(),
            reader,
            line_number: 0,
            field_mask: AttrMask::EMPTY,
            field_count: 0,
            checkpointed: false,
            skip_to_checkpoint: false,
            stats: DecodeStats::default(),
            line: String::new(),
        };
        this.read_header()?;
        Ok(this)
    }

    /// The field mask derived from the header.
    #[must_use]
    pub const fn field_mask(&self) -> AttrMask {
        self.field_mask
    }

    /// Name of the underlying file, for diagnostics.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Line number of the most recently read line.
    #[must_use]
    pub const fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Decode totals so far.
    #[must_use]
    pub const fn stats(&self) -> &DecodeStats {
        &self.stats
    }

    /// Whether the source has checkpoint boundaries coarser than one line.
    #[must_use]
    pub const fn is_checkpointed(&self) -> bool {
        self.checkpointed
    }

    /// Arm skip-to-next-checkpoint. Until the next checkpoint boundary,
    /// records are discarded without individual malformed events.
    pub fn request_resync(&mut self) {
        self.skip_to_checkpoint = true;
    }

    fn read_header(&mut self) -> Result<()> {
        let header = match self.read_line()? {
            Some(line) => line,
            None => {
                return Err(FicError::MalformedHeader {
                    file: self.file_name.clone(),
                    details: "empty file".to_string(),
                });
            }
        };
        let mut mask = AttrMask::EMPTY;
        let mut last_index = None;
        for name in header.split(char::from(decoder::SEPARATOR)) {
            let index = attr_index(name).ok_or_else(|| FicError::MalformedHeader {
                file: self.file_name.clone(),
                details: format!("unknown field \"{name}\""),
            })?;
            if last_index.is_some_and(|last| index <= last) {
                return Err(FicError::MalformedHeader {
                    file: self.file_name.clone(),
                    details: format!("field \"{name}\" out of table order"),
                });
            }
            last_index = Some(index);
            mask.insert(index);
        }
        if !mask.contains(ATTR_NAME_INDEX) {
            return Err(FicError::MalformedHeader {
                file: self.file_name.clone(),
                details: "header must include the name field".to_string(),
            });
        }
        self.field_mask = mask;
        self.field_count = mask.count();
        Ok(())
    }

    /// Pull the next record event, or `None` at end of stream.
    pub fn next_event(&mut self) -> Result<Option<RecordEvent>> {
        let Some(line) = self.read_line()? else {
            return Ok(None);
        };
        self.stats.analyzed += 1;

        if self.skip_to_checkpoint {
            // Every line of an uncompressed snapshot begins a checkpoint,
            // so resynchronization is immediate.
            self.skip_to_checkpoint = false;
        }

        let line_number = self.line_number;
        match self.parse_record(&line) {
            Ok(record) => {
                self.stats.decoded += 1;
                Ok(Some(RecordEvent::Record(record)))
            }
            Err(err) if err.is_recoverable() => {
                self.stats.skipped += 1;
                Ok(Some(RecordEvent::Malformed {
                    line_number,
                    details: err.to_string(),
                }))
            }
            Err(err) => Err(err),
        }
    }

    fn parse_record(&self, line: &str) -> Result<ParsedRecord> {
        let malformed = |details: String| FicError::MalformedRecord {
            file: self.file_name.clone(),
            line: self.line_number,
            details,
        };

        let mut fields = vec![String::new(); ATTR_TABLE_LEN];
        let found = decoder::decode_record(line, self.field_mask, &mut fields)?;
        if found != self.field_count {
            return Err(malformed(format!(
                "expected {} fields, found {found}",
                self.field_count
            )));
        }

        let name = &fields[ATTR_NAME_INDEX];
        if !name.starts_with('"') || name[1..].find('"').is_none() {
            return Err(malformed(format!("name is not quoted: {name}")));
        }

        let digest = Sha256::digest(name.as_bytes());
        let mut hash = RecordHash::default();
        hash.copy_from_slice(&digest[..16]);

        Ok(ParsedRecord {
            line_number: self.line_number,
            hash,
            fields,
        })
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        self.line.clear();
        let read = self
            .reader
            .read_line(&mut self.line)
            .map_err(|e| FicError::io(&self.file_name, e))?;
        if read == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        let trimmed = self.line.trim_end_matches(['\n', '\r']);
        Ok(Some(trimmed.to_string()))
    }
}
