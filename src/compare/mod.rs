//! Comparison engine: baseline index, loader, driver, and report writer.
//!
//! The loader builds the hash index once per session; the driver consumes
//! it read-mostly (only the per-entry matched counter mutates) while
//! streaming the second snapshot; the report writer serializes each
//! classified result. Everything runs single-threaded and synchronous.

pub mod backing;
pub mod decoder;
pub mod driver;
pub mod index;
pub mod loader;
pub mod report;
pub mod session;
