//! Structured error types for migration runs.
//!
//! Every failure here is fatal to the run. Recoverable conditions (a missing
//! `version` field, a remove that finds nothing) are logged, not returned.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Configuration document
    ConfigParseError,
    InvalidVersion,
    SerializeError,

    // Migration files
    MigrationParseError,
    DuplicateVersion,
    NoMigrations,

    // Filesystem
    DirectoryAccessError,
    AlreadyExists,
    IoError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigParseError => "CONFIG_PARSE_ERROR",
            ErrorCode::InvalidVersion => "INVALID_VERSION",
            ErrorCode::SerializeError => "SERIALIZE_ERROR",
            ErrorCode::MigrationParseError => "MIGRATION_PARSE_ERROR",
            ErrorCode::DuplicateVersion => "DUPLICATE_VERSION",
            ErrorCode::NoMigrations => "NO_MIGRATIONS",
            ErrorCode::DirectoryAccessError => "DIRECTORY_ACCESS_ERROR",
            ErrorCode::AlreadyExists => "ALREADY_EXISTS",
            ErrorCode::IoError => "IO_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised by any stage of a migration run.
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("failed to parse configuration {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("configuration {} must be a mapping at the top level", .path.display())]
    ConfigShape { path: PathBuf },

    #[error("configuration {} has an invalid version: {found}", .path.display())]
    InvalidVersion { path: PathBuf, found: String },

    #[error("failed to render configuration: {source}")]
    Serialize {
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to parse migration {}: {source}", .path.display())]
    MigrationParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid migration {}: {reason}", .path.display())]
    InvalidMigration { path: PathBuf, reason: String },

    #[error(
        "migrations {} and {} both declare version {version}",
        .first.display(),
        .second.display()
    )]
    DuplicateVersion {
        version: u64,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("no migration files found in {}", .path.display())]
    NoMigrations { path: PathBuf },

    #[error("cannot read migrations directory {}: {source}", .path.display())]
    DirectoryAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} already exists", .path.display())]
    AlreadyExists { path: PathBuf },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MigrateError {
    pub fn code(&self) -> ErrorCode {
        match self {
            MigrateError::ConfigParse { .. } | MigrateError::ConfigShape { .. } => {
                ErrorCode::ConfigParseError
            }
            MigrateError::InvalidVersion { .. } => ErrorCode::InvalidVersion,
            MigrateError::Serialize { .. } => ErrorCode::SerializeError,
            MigrateError::MigrationParse { .. } | MigrateError::InvalidMigration { .. } => {
                ErrorCode::MigrationParseError
            }
            MigrateError::DuplicateVersion { .. } => ErrorCode::DuplicateVersion,
            MigrateError::NoMigrations { .. } => ErrorCode::NoMigrations,
            MigrateError::DirectoryAccess { .. } => ErrorCode::DirectoryAccessError,
            MigrateError::AlreadyExists { .. } => ErrorCode::AlreadyExists,
            MigrateError::Io { .. } => ErrorCode::IoError,
        }
    }

    // Convenience constructors

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        MigrateError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn invalid_migration(path: &Path, reason: impl Into<String>) -> Self {
        MigrateError::InvalidMigration {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Result type for migration operations.
pub type MigrateResult<T> = std::result::Result<T, MigrateError>;
