//! File Integrity Compare (fic) — snapshot comparison engine for
//! file-integrity baselining.
//!
//! A baseline snapshot is loaded into a hash-keyed index (optionally
//! backed by an unlinked, memory-mapped spill file), then a second
//! snapshot is streamed against it record by record. Every record is
//! classified as changed, missing, new, unknown, or crossed under a
//! configurable attribute mask, and the result is written as a delimited
//! comparison report.
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use file_integrity_compare::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use file_integrity_compare::compare::loader::load_baseline;
//! use file_integrity_compare::decode::SnapshotReader;
//! ```

pub mod prelude;

pub mod compare;
pub mod core;
pub mod decode;
pub mod logger;
