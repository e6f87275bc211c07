//! Session event logging for the CLI collaborator.
//!
//! The comparison core never logs; it returns errors upward. The CLI
//! records session lifecycle events here when configured to.

pub mod jsonl;
