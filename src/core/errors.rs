//! FIC-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, FicError>;

/// Top-level error type for the file-integrity comparison engine.
///
/// Code ranges follow the error taxonomy: 1xxx configuration/usage,
/// 2xxx input-format (recoverable per record), 3xxx resource/IO,
/// 4xxx internal invariant violations (always fatal).
#[derive(Debug, Error)]
pub enum FicError {
    #[error("[FIC-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[FIC-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[FIC-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[FIC-1004] unknown attribute name: {name}")]
    UnknownAttribute { name: String },

    #[error("[FIC-2001] malformed record in {file}, line {line}: {details}")]
    MalformedRecord {
        file: String,
        line: u64,
        details: String,
    },

    #[error("[FIC-2002] line length {length} exceeds {limit} bytes")]
    LineTooLong { length: usize, limit: usize },

    #[error("[FIC-2003] malformed snapshot header in {file}: {details}")]
    MalformedHeader { file: String, details: String },

    #[error("[FIC-3001] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[FIC-3002] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[FIC-3003] backing store failure: {details}")]
    BackingStore { details: String },

    #[error("[FIC-4001] hash collision in {file}, line {line}: check for duplicate filenames")]
    HashCollision { file: String, line: u64 },

    #[error("[FIC-4002] record name is not quoted: {name}")]
    UnquotedName { name: String },

    #[error(
        "[FIC-4003] payload reference out of bounds: offset {offset} + len {len} > store size {size}"
    )]
    PayloadBounds { offset: u64, len: u64, size: u64 },

    #[error("[FIC-4004] payload at offset {offset} is not valid UTF-8")]
    PayloadEncoding { offset: u64 },
}

impl FicError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "FIC-1001",
            Self::MissingConfig { .. } => "FIC-1002",
            Self::ConfigParse { .. } => "FIC-1003",
            Self::UnknownAttribute { .. } => "FIC-1004",
            Self::MalformedRecord { .. } => "FIC-2001",
            Self::LineTooLong { .. } => "FIC-2002",
            Self::MalformedHeader { .. } => "FIC-2003",
            Self::Io { .. } => "FIC-3001",
            Self::Serialization { .. } => "FIC-3002",
            Self::BackingStore { .. } => "FIC-3003",
            Self::HashCollision { .. } => "FIC-4001",
            Self::UnquotedName { .. } => "FIC-4002",
            Self::PayloadBounds { .. } => "FIC-4003",
            Self::PayloadEncoding { .. } => "FIC-4004",
        }
    }

    /// Whether the failure is a per-record input problem the caller may
    /// count and skip. Everything else aborts the session.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::MalformedRecord { .. } | Self::LineTooLong { .. })
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for FicError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for FicError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_errors() -> Vec<FicError> {
        vec![
            FicError::InvalidConfig {
                details: String::new(),
            },
            FicError::MissingConfig {
                path: PathBuf::new(),
            },
            FicError::ConfigParse {
                context: "",
                details: String::new(),
            },
            FicError::UnknownAttribute {
                name: String::new(),
            },
            FicError::MalformedRecord {
                file: String::new(),
                line: 0,
                details: String::new(),
            },
            FicError::LineTooLong {
                length: 0,
                limit: 0,
            },
            FicError::MalformedHeader {
                file: String::new(),
                details: String::new(),
            },
            FicError::Io {
                path: PathBuf::new(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "test"),
            },
            FicError::Serialization {
                context: "",
                details: String::new(),
            },
            FicError::BackingStore {
                details: String::new(),
            },
            FicError::HashCollision {
                file: String::new(),
                line: 0,
            },
            FicError::UnquotedName {
                name: String::new(),
            },
            FicError::PayloadBounds {
                offset: 0,
                len: 0,
                size: 0,
            },
            FicError::PayloadEncoding { offset: 0 },
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let errors = sample_errors();
        let codes: Vec<&str> = errors.iter().map(FicError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn error_codes_have_fic_prefix() {
        for err in &sample_errors() {
            assert!(
                err.code().starts_with("FIC-"),
                "code {} must start with FIC-",
                err.code()
            );
        }
    }

    #[test]
    fn error_display_includes_code() {
        let err = FicError::HashCollision {
            file: "baseline.map".to_string(),
            line: 42,
        };
        let msg = err.to_string();
        assert!(
            msg.contains("FIC-4001"),
            "display should contain error code: {msg}"
        );
        assert!(
            msg.contains("baseline.map") && msg.contains("42"),
            "display should contain file and line: {msg}"
        );
    }

    #[test]
    fn only_input_format_errors_are_recoverable() {
        for err in &sample_errors() {
            let expected = matches!(
                err,
                FicError::MalformedRecord { .. } | FicError::LineTooLong { .. }
            );
            assert_eq!(
                err.is_recoverable(),
                expected,
                "recoverability mismatch for {}",
                err.code()
            );
        }
    }

    #[test]
    fn io_convenience_constructor() {
        let err = FicError::io(
            "/tmp/baseline.map",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.code(), "FIC-3001");
        assert!(err.to_string().contains("/tmp/baseline.map"));
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: FicError = json_err.into();
        assert_eq!(err.code(), "FIC-3002");
    }

    #[test]
    fn from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= invalid").unwrap_err();
        let err: FicError = toml_err.into();
        assert_eq!(err.code(), "FIC-1003");
    }
}
