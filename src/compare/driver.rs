//! Comparison driver: streams a snapshot against a loaded baseline.
//!
//! For every snapshot record the driver looks up the baseline entry with
//! the same identity hash, diffs the attributes selected by the compare
//! mask, classifies the result, and emits a report line for everything but
//! the silent-unchanged case. Baseline entries never matched are reported
//! as missing once the stream ends, in bucket-then-chain order.

use std::io::{BufRead, Write};

use crate::compare::decoder::{self, FieldBuffer};
use crate::compare::loader::BaselineData;
use crate::compare::report::{Category, ReportRecord, ReportWriter};
use crate::compare::session::CompareSession;
use crate::core::attrs::{ATTR_NAME_INDEX, AttrMask};
use crate::core::errors::{FicError, Result};
use crate::decode::{RecordEvent, SnapshotReader};

/// Run the comparison pass and the missing-entry sweep.
///
/// Malformed snapshot records are skipped (the reader counts them);
/// read errors and identity collisions abort the session.
pub fn run_compare<R: BufRead, W: Write>(
    session: &mut CompareSession,
    baseline: &mut BaselineData,
    snapshot: &mut SnapshotReader<R>,
    report: &mut ReportWriter<W>,
) -> Result<()> {
    let compare_mask = session.options().compare_mask;
    let baseline_mask = baseline.field_mask();
    let mut baseline_fields = FieldBuffer::new();

    while let Some(event) = snapshot.next_event()? {
        let record = match event {
            RecordEvent::Record(record) => record,
            RecordEvent::Malformed { .. } => {
                if snapshot.is_checkpointed() {
                    snapshot.request_resync();
                }
                continue;
            }
        };
        session.counters_mut().bump_analyzed();

        let Some(handle) = baseline.index().lookup(&record.hash) else {
            session.counters_mut().bump_new();
            report.write_record(&ReportRecord {
                category: Category::New,
                name_payload: &record.fields[ATTR_NAME_INDEX],
                changed: AttrMask::EMPTY,
                unknown: AttrMask::EMPTY,
                baseline_line: 0,
                snapshot_line: record.line_number,
            })?;
            continue;
        };

        // A second snapshot record resolving to the same baseline entry
        // means duplicate identities in the snapshot itself; the report
        // would be meaningless past this point.
        if baseline.index_mut().record_matched(handle) > 1 {
            return Err(FicError::HashCollision {
                file: snapshot.file_name().to_string(),
                line: record.line_number,
            });
        }

        let baseline_line = baseline.index().entry(handle).line_number();
        let text = baseline.record_text(handle)?;
        decoder::decode_record(text, baseline_mask, baseline_fields.slots_mut())?;

        let mut changed = AttrMask::EMPTY;
        let mut unknown = AttrMask::EMPTY;
        for index in compare_mask.indices() {
            let baseline_value = baseline_fields.get(index);
            let snapshot_value = record.fields[index].as_str();
            if baseline_value.is_empty() || snapshot_value.is_empty() {
                unknown.insert(index);
            } else if baseline_value != snapshot_value {
                changed.insert(index);
            }
        }

        let category = match (changed.is_empty(), unknown.is_empty()) {
            (false, true) => {
                session.counters_mut().bump_changed();
                Category::Changed
            }
            (true, false) => {
                session.counters_mut().bump_unknown();
                Category::Unknown
            }
            (false, false) => {
                session.counters_mut().bump_crossed();
                Category::Crossed
            }
            (true, true) => continue, // Nothing to report.
        };

        report.write_record(&ReportRecord {
            category,
            name_payload: baseline_fields.get(ATTR_NAME_INDEX),
            changed,
            unknown,
            baseline_line,
            snapshot_line: record.line_number,
        })?;
    }

    enumerate_missing(session, baseline, report)
}

/// Report every baseline entry whose matched counter is still zero, in
/// bucket order then insertion order within each chain. Reimplementations
/// must preserve this exact order.
fn enumerate_missing<W: Write>(
    session: &mut CompareSession,
    baseline: &BaselineData,
    report: &mut ReportWriter<W>,
) -> Result<()> {
    for handle in baseline.index().iter_bucket_order() {
        let entry = baseline.index().entry(handle);
        if entry.matched() != 0 {
            continue;
        }
        session.counters_mut().bump_missing();
        report.write_record(&ReportRecord {
            category: Category::Missing,
            name_payload: baseline.record_text(handle)?,
            changed: AttrMask::EMPTY,
            unknown: AttrMask::EMPTY,
            baseline_line: entry.line_number(),
            snapshot_line: 0,
        })?;
    }
    Ok(())
}
