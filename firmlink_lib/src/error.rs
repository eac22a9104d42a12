//! Error types for the library layer.

use std::fmt;
use std::path::PathBuf;

use crate::config::ConfigError;
use crate::db::DbError;
use crate::lexicon::LexiconError;

/// Reference input missing or structurally unreadable. Always fatal.
#[derive(thiserror::Error, Debug)]
pub enum ReferenceDataError {
    #[error("{table} file not found: {path}")]
    Missing { table: &'static str, path: PathBuf },
    #[error("{table} table is unreadable: {source}")]
    Unreadable {
        table: &'static str,
        #[source]
        source: csv::Error,
    },
    #[error("{table} table is missing required column '{column}'")]
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },
    #[error("firm registry is empty")]
    EmptyRegistry,
}

/// A single malformed row. The row is skipped and counted.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("{table} row {line}: missing required field '{field}'")]
    MissingField {
        table: &'static str,
        line: u64,
        field: &'static str,
    },
    #[error("{table} row {line}: invalid value for '{field}': {value}")]
    InvalidField {
        table: &'static str,
        line: u64,
        field: &'static str,
        value: String,
    },
    #[error("{table} row {line}: duplicate id '{id}'")]
    DuplicateId {
        table: &'static str,
        line: u64,
        id: String,
    },
    #[error("{table} row {line}: {message}")]
    Unparseable {
        table: &'static str,
        line: u64,
        message: String,
    },
}

/// Errors produced by the library layer.
#[derive(Debug)]
pub enum FirmLinkError {
    /// A reference table is missing or unreadable; the run aborts.
    ReferenceData(ReferenceDataError),
    /// Configuration failed to load or validate.
    Config(ConfigError),
    /// The checkpoint store failed.
    Db(DbError),
    /// Writing an output table failed.
    Csv(csv::Error),
    /// Filesystem failure while writing output.
    Io(std::io::Error),
    /// Serializing the run summary failed.
    Json(serde_json::Error),
}

impl fmt::Display for FirmLinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReferenceData(e) => write!(f, "Reference data error: {}", e),
            Self::Config(e) => write!(f, "Config error: {}", e),
            Self::Db(e) => write!(f, "Checkpoint store error: {}", e),
            Self::Csv(e) => write!(f, "CSV output error: {}", e),
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for FirmLinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReferenceData(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Db(e) => Some(e),
            Self::Csv(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
        }
    }
}

impl From<ReferenceDataError> for FirmLinkError {
    fn from(e: ReferenceDataError) -> Self {
        Self::ReferenceData(e)
    }
}

impl From<ConfigError> for FirmLinkError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<LexiconError> for FirmLinkError {
    fn from(e: LexiconError) -> Self {
        Self::Config(ConfigError::Lexicon(e))
    }
}

impl From<DbError> for FirmLinkError {
    fn from(e: DbError) -> Self {
        Self::Db(e)
    }
}

impl From<csv::Error> for FirmLinkError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

impl From<std::io::Error> for FirmLinkError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for FirmLinkError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}
