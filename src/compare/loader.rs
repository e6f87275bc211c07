//! Baseline loader: builds the hash index from a baseline snapshot stream.
//!
//! Each decoded record's mask-selected fields are joined back into one
//! delimited string, which either stays owned by its index entry or spills
//! to the backing file that is memory-mapped once the whole baseline has
//! been consumed. A duplicate identity hash aborts the load: two baseline
//! records with the same identity mean duplicate filenames, and comparing
//! against such a baseline would silently misreport.

use std::io::BufRead;

use crate::compare::backing::{BackingWriter, MappedStore};
use crate::compare::decoder::join_selected;
use crate::compare::index::{BaselineIndex, EntryHandle, PayloadRef};
use crate::compare::session::{StorageMode, TeardownPolicy};
use crate::core::attrs::AttrMask;
use crate::core::errors::{FicError, Result};
use crate::decode::{RecordEvent, SnapshotReader};

/// Where baseline record text lives after the load.
#[derive(Debug)]
enum RecordStore {
    /// Every entry owns its payload.
    Owned,
    /// Payloads live in the mapped backing store.
    Mapped(MappedStore),
}

/// A fully loaded baseline: index plus payload store.
///
/// The store must outlive every payload access; both are released together
/// at session teardown via [`BaselineData::release`].
#[derive(Debug)]
pub struct BaselineData {
    index: BaselineIndex,
    store: RecordStore,
    field_mask: AttrMask,
    file_name: String,
}

impl BaselineData {
    /// The hash index.
    #[must_use]
    pub const fn index(&self) -> &BaselineIndex {
        &self.index
    }

    pub(crate) fn index_mut(&mut self) -> &mut BaselineIndex {
        &mut self.index
    }

    /// Field mask the baseline was captured with.
    #[must_use]
    pub const fn field_mask(&self) -> AttrMask {
        self.field_mask
    }

    /// Baseline file name, for diagnostics.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Borrow an entry's joined record text.
    pub fn record_text(&self, handle: EntryHandle) -> Result<&str> {
        match self.index.entry(handle).payload() {
            PayloadRef::Owned(text) => Ok(text),
            PayloadRef::Spilled { offset, len } => match &self.store {
                RecordStore::Mapped(store) => store.text(*offset, *len),
                RecordStore::Owned => Err(FicError::BackingStore {
                    details: "spilled payload without a mapped store".to_string(),
                }),
            },
        }
    }

    /// Tear down the baseline under `policy`.
    ///
    /// `SkipAbove` deliberately leaks the owned payload arena for sessions
    /// past the threshold: the process is terminal at that point and bulk
    /// per-record frees have been observed to cost more than the compare
    /// pass itself on some platforms. A mapped store is one allocation and
    /// always drops.
    pub fn release(self, policy: TeardownPolicy) {
        if let TeardownPolicy::SkipAbove(limit) = policy {
            if matches!(self.store, RecordStore::Owned) && self.index.len() as u64 > limit {
                std::mem::forget(self);
            }
        }
    }
}

/// Stream the baseline and build its index under the given storage mode.
pub fn load_baseline<R: BufRead>(
    reader: &mut SnapshotReader<R>,
    storage: &StorageMode,
) -> Result<BaselineData> {
    let mut writer = match storage {
        StorageMode::InMemory => None,
        StorageMode::MemoryMapped { dir } => {
            let dir = dir.clone().unwrap_or_else(std::env::temp_dir);
            Some(BackingWriter::create(&dir)?)
        }
    };
    let mut index = BaselineIndex::new();
    let field_mask = reader.field_mask();

    while let Some(event) = reader.next_event()? {
        let record = match event {
            RecordEvent::Record(record) => record,
            RecordEvent::Malformed { .. } => {
                if reader.is_checkpointed() {
                    reader.request_resync();
                }
                continue;
            }
        };

        let joined = join_selected(&record.fields, field_mask);
        let payload = if let Some(writer) = writer.as_mut() {
            let offset = writer.append(&joined)?;
            let len = u32::try_from(joined.len()).map_err(|_| FicError::BackingStore {
                details: format!("record at line {} exceeds payload bounds", record.line_number),
            })?;
            PayloadRef::Spilled { offset, len }
        } else {
            PayloadRef::Owned(joined.into_boxed_str())
        };

        index
            .insert(record.hash, record.line_number, payload)
            .ok_or_else(|| FicError::HashCollision {
                file: reader.file_name().to_string(),
                line: record.line_number,
            })?;
    }

    let store = match writer {
        Some(writer) => RecordStore::Mapped(writer.finish()?),
        None => RecordStore::Owned,
    };

    Ok(BaselineData {
        index,
        store,
        field_mask,
        file_name: reader.file_name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::SnapshotReader;
    use std::io::Cursor;

    const BASELINE: &str = "name|size|md5\n\
                            \"/etc/passwd\"|4096|aa11\n\
                            \"/etc/group\"|812|bb22\n\
                            \"/bin/sh\"|129816|cc33\n";

    fn open(content: &str) -> SnapshotReader<Cursor<Vec<u8>>> {
        SnapshotReader::from_reader(Cursor::new(content.as_bytes().to_vec()), "baseline.map")
            .expect("header")
    }

    #[test]
    fn in_memory_load_round_trips_records() {
        let mut reader = open(BASELINE);
        let baseline = load_baseline(&mut reader, &StorageMode::InMemory).unwrap();
        assert_eq!(baseline.index().len(), 3);

        let handles: Vec<_> = baseline.index().iter_bucket_order().collect();
        let mut texts: Vec<&str> = handles
            .iter()
            .map(|&h| baseline.record_text(h).unwrap())
            .collect();
        texts.sort_unstable();
        assert_eq!(
            texts,
            vec![
                "\"/bin/sh\"|129816|cc33",
                "\"/etc/group\"|812|bb22",
                "\"/etc/passwd\"|4096|aa11",
            ]
        );
    }

    #[test]
    fn mapped_load_matches_in_memory_payloads() {
        let mut in_mem_reader = open(BASELINE);
        let in_mem = load_baseline(&mut in_mem_reader, &StorageMode::InMemory).unwrap();

        let mut mapped_reader = open(BASELINE);
        let mapped = load_baseline(
            &mut mapped_reader,
            &StorageMode::MemoryMapped { dir: None },
        )
        .unwrap();

        assert_eq!(in_mem.index().len(), mapped.index().len());
        for handle in in_mem.index().iter_bucket_order() {
            let hash = *in_mem.index().entry(handle).hash();
            let other = mapped.index().lookup(&hash).expect("same identity set");
            assert_eq!(
                in_mem.record_text(handle).unwrap(),
                mapped.record_text(other).unwrap()
            );
        }
    }

    #[test]
    fn duplicate_identity_aborts_load() {
        let content = "name|size\n\"/same\"|1\n\"/same\"|2\n";
        let mut reader = open(content);
        let err = load_baseline(&mut reader, &StorageMode::InMemory).unwrap_err();
        assert_eq!(err.code(), "FIC-4001");
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn malformed_records_are_skipped_not_fatal() {
        let content = "name|size\n\"/a\"|1\nnot-quoted|2\n\"/b\"|3\n";
        let mut reader = open(content);
        let baseline = load_baseline(&mut reader, &StorageMode::InMemory).unwrap();
        assert_eq!(baseline.index().len(), 2);
        assert_eq!(reader.stats().skipped, 1);
    }

    #[test]
    fn empty_baseline_loads_empty_index() {
        let mut reader = open("name|size\n");
        let baseline =
            load_baseline(&mut reader, &StorageMode::MemoryMapped { dir: None }).unwrap();
        assert!(baseline.index().is_empty());
    }

    #[test]
    fn release_drops_below_skip_threshold() {
        let mut reader = open(BASELINE);
        let baseline = load_baseline(&mut reader, &StorageMode::InMemory).unwrap();
        // 3 entries <= 10: teardown runs normally.
        baseline.release(TeardownPolicy::SkipAbove(10));

        let mut reader = open(BASELINE);
        let baseline = load_baseline(&mut reader, &StorageMode::InMemory).unwrap();
        baseline.release(TeardownPolicy::Drop);
    }
}
