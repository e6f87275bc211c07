//! Record decoder: splits one delimited record line into per-attribute slots.
//!
//! A record carries only the fields its field mask selected, in attribute
//! table order. Decoding maps the nth field of the line back to the nth set
//! bit of the mask and writes it into that attribute's slot, leaving
//! unselected slots empty.

use memchr::memchr_iter;

use crate::core::attrs::{ATTR_TABLE_LEN, AttrMask};
use crate::core::errors::{FicError, Result};

/// Reserved field separator byte.
pub const SEPARATOR: u8 = b'|';

/// Separator as a string slice, for joining.
pub const SEPARATOR_STR: &str = "|";

/// Maximum record line length in bytes, terminator included.
pub const MAX_LINE_LEN: usize = 8192;

/// Reusable destination buffer with one slot per attribute in the table.
#[derive(Debug)]
pub struct FieldBuffer {
    slots: Vec<String>,
}

impl FieldBuffer {
    /// Allocate an empty buffer with [`ATTR_TABLE_LEN`] slots.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: vec![String::new(); ATTR_TABLE_LEN],
        }
    }

    /// Value of the attribute slot at `index`. Empty when not selected.
    #[must_use]
    pub fn get(&self, index: usize) -> &str {
        &self.slots[index]
    }

    /// All slots, table-ordered.
    #[must_use]
    pub fn slots(&self) -> &[String] {
        &self.slots
    }

    /// Mutable access for decoding.
    pub fn slots_mut(&mut self) -> &mut [String] {
        &mut self.slots
    }
}

impl Default for FieldBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode one record line into `slots` under `field_mask`.
///
/// Every slot is reset to empty before any field is written, so leftover
/// values from a previous decode can never leak into this one. Fields
/// beyond the mask's selection are ignored. Returns the number of fields
/// found in the line.
pub fn decode_record(line: &str, field_mask: AttrMask, slots: &mut [String]) -> Result<usize> {
    debug_assert_eq!(slots.len(), ATTR_TABLE_LEN);
    for slot in slots.iter_mut() {
        slot.clear();
    }

    if line.len() > MAX_LINE_LEN - 1 {
        return Err(FicError::LineTooLong {
            length: line.len(),
            limit: MAX_LINE_LEN - 1,
        });
    }

    let bytes = line.as_bytes();
    let mut targets = field_mask.indices();
    let mut start = 0usize;
    let mut field_count = 0usize;
    let mut write_field = |range_start: usize, range_end: usize, target: Option<usize>| {
        if let Some(index) = target {
            slots[index].push_str(&line[range_start..range_end]);
        }
    };
    for sep in memchr_iter(SEPARATOR, bytes) {
        write_field(start, sep, targets.next());
        field_count += 1;
        start = sep + 1;
    }
    write_field(start, line.len(), targets.next());
    field_count += 1;

    Ok(field_count)
}

/// Join the mask-selected slots into one delimited record string, in
/// mask-bit order. The inverse of [`decode_record`] for values free of the
/// separator byte.
#[must_use]
pub fn join_selected(slots: &[String], field_mask: AttrMask) -> String {
    let mut total = 0usize;
    for index in field_mask.indices() {
        total += slots[index].len() + 1;
    }
    let mut joined = String::with_capacity(total);
    for (n, index) in field_mask.indices().enumerate() {
        if n > 0 {
            joined.push_str(SEPARATOR_STR);
        }
        joined.push_str(&slots[index]);
    }
    joined
}
