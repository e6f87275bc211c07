//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use file_integrity_compare::prelude::*;
//! ```

// Core
pub use crate::core::attrs::{ATTR_TABLE, ATTR_TABLE_LEN, AttrMask, attr_index};
pub use crate::core::config::Config;
pub use crate::core::errors::{FicError, Result};

// Decode
pub use crate::decode::{DecodeStats, ParsedRecord, RecordEvent, SnapshotReader};

// Compare
pub use crate::compare::driver::run_compare;
pub use crate::compare::index::{BaselineIndex, EntryHandle, RecordHash};
pub use crate::compare::loader::{BaselineData, load_baseline};
pub use crate::compare::report::{Category, ReportRecord, ReportWriter};
pub use crate::compare::session::{
    CompareOptions, CompareSession, Newline, SessionCounters, StorageMode, TeardownPolicy,
};

// Logging
pub use crate::logger::jsonl::JsonlLogger;
