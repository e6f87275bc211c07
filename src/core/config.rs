//! Configuration system: TOML file + env var overrides + defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::attrs::AttrMask;
use crate::core::errors::{FicError, Result};

/// Full configuration model for a comparison run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    pub compare: CompareConfig,
    pub report: ReportConfig,
    pub log: LogConfig,
}

/// Comparison engine knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CompareConfig {
    /// Attribute mask grammar string selecting which attributes are diffed.
    pub mask: String,
    /// Spill baseline record payloads to an unlinked backing file and map
    /// it once the load completes, instead of one allocation per record.
    pub memory_map: bool,
    /// Directory for the anonymous backing file. Defaults to the system
    /// temp directory when unset.
    pub memory_map_dir: Option<PathBuf>,
    /// Skip explicit per-record payload teardown for sessions with more
    /// entries than this. 0 keeps teardown on unconditionally.
    pub skip_teardown_above: u64,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            mask: "all".to_string(),
            memory_map: false,
            memory_map_dir: None,
            skip_teardown_above: 0,
        }
    }
}

/// Report output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReportConfig {
    /// Report destination. Unset means stdout.
    pub path: Option<PathBuf>,
    /// Line terminator: "lf" or "crlf". Fixed for the whole session.
    pub newline: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: None,
            newline: "lf".to_string(),
        }
    }
}

/// Session event log settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// Whether the CLI records session events at all.
    pub enabled: bool,
    /// JSONL log destination. Unset disables file logging even when enabled.
    pub path: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, apply env overrides, validate.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FicError::MissingConfig {
                path: path.to_path_buf(),
            });
        }
        let raw = fs::read_to_string(path).map_err(|e| FicError::io(path, e))?;
        let mut config: Self = toml::from_str(&raw)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Defaults with env overrides applied, for runs without a config file.
    pub fn load_default() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Environment variables override file values: `FIC_COMPARE_MASK`,
    /// `FIC_MEMORY_MAP`, `FIC_REPORT_NEWLINE`.
    fn apply_env_overrides(&mut self) {
        if let Ok(mask) = env::var("FIC_COMPARE_MASK") {
            self.compare.mask = mask;
        }
        if let Ok(value) = env::var("FIC_MEMORY_MAP") {
            if let Ok(flag) = value.parse::<bool>() {
                self.compare.memory_map = flag;
            }
        }
        if let Ok(newline) = env::var("FIC_REPORT_NEWLINE") {
            self.report.newline = newline;
        }
    }

    /// Reject configurations the engine cannot honor.
    pub fn validate(&self) -> Result<()> {
        self.compare_mask()?;
        if self.report.newline != "lf" && self.report.newline != "crlf" {
            return Err(FicError::InvalidConfig {
                details: format!(
                    "report.newline must be \"lf\" or \"crlf\", got \"{}\"",
                    self.report.newline
                ),
            });
        }
        Ok(())
    }

    /// Parse the configured compare mask.
    pub fn compare_mask(&self) -> Result<AttrMask> {
        self.compare.mask.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().expect("defaults must validate");
        assert_eq!(config.compare_mask().unwrap(), AttrMask::ALL);
        assert_eq!(config.report.newline, "lf");
        assert!(!config.compare.memory_map);
        assert_eq!(config.compare.skip_teardown_above, 0);
    }

    #[test]
    fn toml_round_trip() {
        let config = Config {
            compare: CompareConfig {
                mask: "all-magic".to_string(),
                memory_map: true,
                memory_map_dir: Some(PathBuf::from("/var/tmp")),
                skip_teardown_above: 700_000,
            },
            report: ReportConfig {
                path: Some(PathBuf::from("report.cmp")),
                newline: "crlf".to_string(),
            },
            log: LogConfig {
                enabled: true,
                path: Some(PathBuf::from("fic.jsonl")),
            },
        };
        let raw = toml::to_string(&config).expect("serialize");
        let reparsed: Config = toml::from_str(&raw).expect("reparse");
        assert_eq!(config, reparsed);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: Config = toml::from_str("[compare]\nmask = \"size+md5\"\n").unwrap();
        assert_eq!(config.compare.mask, "size+md5");
        assert_eq!(config.report.newline, "lf");
        assert!(!config.log.enabled);
    }

    #[test]
    fn validate_rejects_bad_mask() {
        let config: Config = toml::from_str("[compare]\nmask = \"bogus\"\n").unwrap();
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), "FIC-1004");
    }

    #[test]
    fn validate_rejects_bad_newline() {
        let config: Config = toml::from_str("[report]\nnewline = \"cr\"\n").unwrap();
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), "FIC-1001");
    }

    #[test]
    fn load_missing_file_is_fic_1002() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("absent.toml")).unwrap_err();
        assert_eq!(err.code(), "FIC-1002");
    }

    #[test]
    fn load_parses_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fic.toml");
        fs::write(&path, "[compare]\nmask = \"all-sha1\"\nmemory_map = true\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.compare.mask, "all-sha1");
        assert!(config.compare.memory_map);
    }
}
