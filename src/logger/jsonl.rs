//! JSONL logger: append-only line-delimited JSON session events.
//!
//! Each line is a self-contained JSON object, assembled in memory and
//! written with a single `write_all` so a concurrently tailing process
//! never sees a partial line. Logging failures fall back to stderr with a
//! `[FIC-JSONL]` prefix and are otherwise discarded — a batch compare must
//! never fail because its log sink did.

#![allow(missing_docs)]

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::compare::session::SessionCounters;

/// Severity level for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Error,
}

/// Session lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    CompareStart,
    CompareComplete,
    Error,
}

/// Aggregate counters as recorded in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRecord {
    pub analyzed: u64,
    pub changed: u64,
    pub unknown: u64,
    pub crossed: u64,
    pub new: u64,
    pub missing: u64,
}

impl From<&SessionCounters> for CounterRecord {
    fn from(counters: &SessionCounters) -> Self {
        Self {
            analyzed: counters.analyzed(),
            changed: counters.changed(),
            unknown: counters.unknown(),
            crossed: counters.crossed(),
            new: counters.new_records(),
            missing: counters.missing(),
        }
    }
}

/// A single JSONL log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counters: Option<CounterRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl LogEntry {
    fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: Utc::now().to_rfc3339(),
            event,
            severity,
            baseline: None,
            snapshot: None,
            counters: None,
            error_code: None,
            error_message: None,
        }
    }
}

/// Append-only JSONL sink with stderr fallback.
#[derive(Debug, Clone)]
pub struct JsonlLogger {
    path: Option<PathBuf>,
}

impl JsonlLogger {
    /// Logger writing to `path`; `None` routes everything to the fallback.
    #[must_use]
    pub const fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// Logger that records nothing anywhere.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { path: None }
    }

    /// Record a session start.
    pub fn compare_start(&self, baseline: &str, snapshot: &str) {
        let mut entry = LogEntry::new(EventType::CompareStart, Severity::Info);
        entry.baseline = Some(baseline.to_string());
        entry.snapshot = Some(snapshot.to_string());
        self.append(&entry);
    }

    /// Record a completed session with its counters.
    pub fn compare_complete(&self, counters: &SessionCounters) {
        let mut entry = LogEntry::new(EventType::CompareComplete, Severity::Info);
        entry.counters = Some(CounterRecord::from(counters));
        self.append(&entry);
    }

    /// Record a fatal session error.
    pub fn error(&self, code: &str, message: &str) {
        let mut entry = LogEntry::new(EventType::Error, Severity::Error);
        entry.error_code = Some(code.to_string());
        entry.error_message = Some(message.to_string());
        self.append(&entry);
    }

    fn append(&self, entry: &LogEntry) {
        let Ok(mut line) = serde_json::to_string(entry) else {
            return;
        };
        line.push('\n');

        if let Some(path) = &self.path {
            let written = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .and_then(|mut file| file.write_all(line.as_bytes()));
            if written.is_ok() {
                return;
            }
        }
        // Fallback; ignore failure, logging must never take the run down.
        let _ = std::io::stderr().write_all(format!("[FIC-JSONL] {line}").as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn entries_append_as_one_json_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fic.jsonl");
        let logger = JsonlLogger::new(Some(path.clone()));

        logger.compare_start("baseline.map", "snapshot.map");
        logger.compare_complete(&SessionCounters::default());
        logger.error("FIC-4001", "hash collision");

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(value.get("ts").is_some());
            assert!(value.get("event").is_some());
        }
    }

    #[test]
    fn counters_round_trip_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fic.jsonl");
        let logger = JsonlLogger::new(Some(path.clone()));
        logger.compare_complete(&SessionCounters::default());

        let content = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(value["event"], "compare_complete");
        assert_eq!(value["counters"]["analyzed"], 0);
        assert!(value.get("error_code").is_none());
    }

    #[test]
    fn event_names_serialize_snake_case() {
        let json = serde_json::to_string(&EventType::CompareStart).unwrap();
        assert_eq!(json, "\"compare_start\"");
    }

    #[test]
    fn disabled_logger_does_not_panic() {
        let logger = JsonlLogger::disabled();
        logger.compare_start("a", "b");
        logger.error("FIC-3001", "io");
    }
}
