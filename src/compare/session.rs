//! Comparison session: options and aggregate counters.
//!
//! One explicitly constructed session object replaces any ambient global:
//! every operation in the engine takes the session (or a piece of it) as an
//! argument, and external summary code reads the counters through accessors
//! after the pass completes.

use std::path::PathBuf;

use crate::core::attrs::AttrMask;
use crate::core::config::Config;
use crate::core::errors::{FicError, Result};

/// Line terminator convention, fixed session-wide before any output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Newline {
    /// One-byte `\n`.
    #[default]
    Lf,
    /// Two-byte `\r\n`.
    Crlf,
}

impl Newline {
    /// Terminator bytes.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::Crlf => "\r\n",
        }
    }

    /// Parse the config spelling ("lf" / "crlf").
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "lf" => Ok(Self::Lf),
            "crlf" => Ok(Self::Crlf),
            other => Err(FicError::InvalidConfig {
                details: format!("newline must be \"lf\" or \"crlf\", got \"{other}\""),
            }),
        }
    }
}

/// Baseline payload storage strategy, selected before loading begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageMode {
    /// Each joined record string is owned by its index entry.
    InMemory,
    /// Records spill to an unlinked backing file, mapped once after load.
    /// `dir` overrides the system temp directory for the backing file.
    MemoryMapped { dir: Option<PathBuf> },
}

/// What to do with owned payload memory at session teardown.
///
/// Freeing hundreds of thousands of per-record allocations can cost more
/// than the comparison itself on some platforms; `SkipAbove` defers the
/// bulk release to process exit for sessions past the threshold. Mapped
/// stores release as a single allocation either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TeardownPolicy {
    /// Always drop payloads explicitly.
    #[default]
    Drop,
    /// Leak the owned payload arena when the session held more entries
    /// than this.
    SkipAbove(u64),
}

/// Resolved options for one comparison session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareOptions {
    /// Attributes actually diffed.
    pub compare_mask: AttrMask,
    /// Baseline payload storage strategy.
    pub storage: StorageMode,
    /// Report line terminator.
    pub newline: Newline,
    /// Payload teardown policy.
    pub teardown: TeardownPolicy,
}

impl CompareOptions {
    /// Resolve options from a validated [`Config`].
    pub fn from_config(config: &Config) -> Result<Self> {
        let storage = if config.compare.memory_map {
            StorageMode::MemoryMapped {
                dir: config.compare.memory_map_dir.clone(),
            }
        } else {
            StorageMode::InMemory
        };
        let teardown = match config.compare.skip_teardown_above {
            0 => TeardownPolicy::Drop,
            n => TeardownPolicy::SkipAbove(n),
        };
        Ok(Self {
            compare_mask: config.compare_mask()?,
            storage,
            newline: Newline::parse(&config.report.newline)?,
            teardown,
        })
    }
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            compare_mask: AttrMask::ALL,
            storage: StorageMode::InMemory,
            newline: Newline::Lf,
            teardown: TeardownPolicy::Drop,
        }
    }
}

/// Monotonic totals owned by the session, incremented only by the driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCounters {
    analyzed: u64,
    changed: u64,
    unknown: u64,
    crossed: u64,
    new: u64,
    missing: u64,
}

impl SessionCounters {
    /// Snapshot records examined, silent-unchanged included.
    #[must_use]
    pub const fn analyzed(&self) -> u64 {
        self.analyzed
    }

    /// Records classified Changed.
    #[must_use]
    pub const fn changed(&self) -> u64 {
        self.changed
    }

    /// Records classified Unknown.
    #[must_use]
    pub const fn unknown(&self) -> u64 {
        self.unknown
    }

    /// Records classified Crossed (changed and unknown bits both set).
    #[must_use]
    pub const fn crossed(&self) -> u64 {
        self.crossed
    }

    /// Snapshot records with no baseline counterpart.
    #[must_use]
    pub const fn new_records(&self) -> u64 {
        self.new
    }

    /// Baseline entries never matched by any snapshot record.
    #[must_use]
    pub const fn missing(&self) -> u64 {
        self.missing
    }

    pub(crate) fn bump_analyzed(&mut self) {
        self.analyzed += 1;
    }

    pub(crate) fn bump_changed(&mut self) {
        self.changed += 1;
    }

    pub(crate) fn bump_unknown(&mut self) {
        self.unknown += 1;
    }

    pub(crate) fn bump_crossed(&mut self) {
        self.crossed += 1;
    }

    pub(crate) fn bump_new(&mut self) {
        self.new += 1;
    }

    pub(crate) fn bump_missing(&mut self) {
        self.missing += 1;
    }
}

/// One comparison session: options plus counters.
#[derive(Debug, Default)]
pub struct CompareSession {
    options: CompareOptions,
    counters: SessionCounters,
}

impl CompareSession {
    /// Construct a session with resolved options.
    #[must_use]
    pub fn new(options: CompareOptions) -> Self {
        Self {
            options,
            counters: SessionCounters::default(),
        }
    }

    /// Session options.
    #[must_use]
    pub const fn options(&self) -> &CompareOptions {
        &self.options
    }

    /// Read-only counters, for summary code after the pass.
    #[must_use]
    pub const fn counters(&self) -> &SessionCounters {
        &self.counters
    }

    pub(crate) fn counters_mut(&mut self) -> &mut SessionCounters {
        &mut self.counters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;

    #[test]
    fn newline_parse_and_bytes() {
        assert_eq!(Newline::parse("lf").unwrap().as_str(), "\n");
        assert_eq!(Newline::parse("crlf").unwrap().as_str(), "\r\n");
        assert_eq!(Newline::parse("cr").unwrap_err().code(), "FIC-1001");
    }

    #[test]
    fn options_from_default_config() {
        let options = CompareOptions::from_config(&Config::default()).unwrap();
        assert_eq!(options.compare_mask, AttrMask::ALL);
        assert_eq!(options.storage, StorageMode::InMemory);
        assert_eq!(options.newline, Newline::Lf);
        assert_eq!(options.teardown, TeardownPolicy::Drop);
    }

    #[test]
    fn options_map_memory_map_and_teardown() {
        let config: Config = toml::from_str(
            "[compare]\nmemory_map = true\nskip_teardown_above = 700000\n",
        )
        .unwrap();
        let options = CompareOptions::from_config(&config).unwrap();
        assert_eq!(options.storage, StorageMode::MemoryMapped { dir: None });
        assert_eq!(options.teardown, TeardownPolicy::SkipAbove(700_000));
    }

    #[test]
    fn counters_start_at_zero_and_bump() {
        let mut session = CompareSession::new(CompareOptions::default());
        assert_eq!(session.counters().analyzed(), 0);
        session.counters_mut().bump_analyzed();
        session.counters_mut().bump_new();
        session.counters_mut().bump_missing();
        assert_eq!(session.counters().analyzed(), 1);
        assert_eq!(session.counters().new_records(), 1);
        assert_eq!(session.counters().missing(), 1);
        assert_eq!(session.counters().changed(), 0);
    }
}
