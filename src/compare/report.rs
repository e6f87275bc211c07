//! Comparison report writer.
//!
//! One delimited line per classified record, in fixed field order:
//! category, quoted name, changed-attribute names, unknown-attribute
//! names, and the baseline,snapshot line-number pair. A header line is
//! written once before the first record. The name payload must arrive
//! well-quoted from the decoder; a violation here is a contract breach,
//! not a data error.

use std::io::Write;
use std::path::PathBuf;

use crate::compare::session::Newline;
use crate::core::attrs::{ATTR_TABLE, AttrMask};
use crate::core::errors::{FicError, Result};

/// Fixed report header columns.
pub const REPORT_HEADER: &str = "category|name|changed|unknown|records";

/// Closed set of report categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// At least one compared attribute differs; none are unknown.
    Changed,
    /// Baseline entry never matched by any snapshot record.
    Missing,
    /// Snapshot record with no baseline counterpart.
    New,
    /// At least one compared attribute is unknown; none changed.
    Unknown,
    /// Changed and unknown attributes both present.
    Crossed,
}

impl Category {
    /// Single-letter report code.
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Changed => 'C',
            Self::Missing => 'M',
            Self::New => 'N',
            Self::Unknown => 'U',
            Self::Crossed => 'X',
        }
    }

    /// Whether this category carries changed/unknown attribute columns.
    #[must_use]
    pub const fn has_attr_columns(self) -> bool {
        matches!(self, Self::Changed | Self::Unknown | Self::Crossed)
    }
}

/// One classified comparison result, ready for serialization.
#[derive(Debug, Clone, Copy)]
pub struct ReportRecord<'a> {
    /// Report category.
    pub category: Category,
    /// Record text beginning with the quoted name field.
    pub name_payload: &'a str,
    /// Attributes whose values differ.
    pub changed: AttrMask,
    /// Attributes unknown on at least one side.
    pub unknown: AttrMask,
    /// Baseline line number, 0 when not applicable.
    pub baseline_line: u64,
    /// Snapshot line number, 0 when not applicable.
    pub snapshot_line: u64,
}

/// Serializes comparison results to a delimited text stream.
#[derive(Debug)]
pub struct ReportWriter<W: Write> {
    out: W,
    target: PathBuf,
    newline: Newline,
    header_written: bool,
    line: String,
}

impl<W: Write> ReportWriter<W> {
    /// Wrap an output stream. `target` labels IO errors.
    #[must_use]
    pub fn new(out: W, target: impl Into<PathBuf>, newline: Newline) -> Self {
        Self {
            out,
            target: target.into(),
            newline,
            header_written: false,
            line: String::new(),
        }
    }

    /// Write the header line if it has not been written yet.
    pub fn write_header(&mut self) -> Result<()> {
        if self.header_written {
            return Ok(());
        }
        self.header_written = true;
        self.line.clear();
        self.line.push_str(REPORT_HEADER);
        self.line.push_str(self.newline.as_str());
        self.flush_line()
    }

    /// Serialize one classified record.
    pub fn write_record(&mut self, record: &ReportRecord<'_>) -> Result<()> {
        self.write_header()?;

        let name = quoted_name(record.name_payload)?;

        self.line.clear();
        self.line.push(record.category.letter());
        self.line.push('|');
        self.line.push_str(name);
        self.line.push('|');
        if record.category.has_attr_columns() {
            push_attr_names(&mut self.line, record.changed);
            self.line.push('|');
            push_attr_names(&mut self.line, record.unknown);
        } else {
            self.line.push('|');
        }
        self.line.push('|');
        self.line
            .push_str(&format!("{},{}", record.baseline_line, record.snapshot_line));
        self.line.push_str(self.newline.as_str());
        self.flush_line()
    }

    /// Flush buffered output.
    pub fn finish(&mut self) -> Result<()> {
        self.out
            .flush()
            .map_err(|e| FicError::io(&self.target, e))
    }

    /// Recover the underlying stream.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn flush_line(&mut self) -> Result<()> {
        self.out
            .write_all(self.line.as_bytes())
            .map_err(|e| FicError::io(&self.target, e))
    }
}

/// Extract the leading quoted name: from the opening quote through the
/// second quote, inclusive.
fn quoted_name(payload: &str) -> Result<&str> {
    let rest = payload.strip_prefix('"').ok_or_else(|| FicError::UnquotedName {
        name: payload.to_string(),
    })?;
    let close = rest.find('"').ok_or_else(|| FicError::UnquotedName {
        name: payload.to_string(),
    })?;
    Ok(&payload[..close + 2])
}

/// Append the display names of `mask`'s attributes, comma-joined, in
/// attribute-table order.
fn push_attr_names(line: &mut String, mask: AttrMask) {
    let mut first = true;
    for spec in &ATTR_TABLE {
        if mask.contains(spec.bit as usize) {
            if !first {
                line.push(',');
            }
            line.push_str(spec.name);
            first = false;
        }
    }
}
