//! Error types for shellfs
//!
//! Only hard failures live here. Expected file-system outcomes (missing
//! targets, busy files, collisions) are [`crate::ClassifiedOutcome`]s.

use std::path::PathBuf;

use crate::backend::Backend;
use crate::operation::OperationKind;
use crate::outcome::ClassifiedOutcome;

/// Result type for shellfs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in shellfs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The active backend does not implement this operation
    #[error("{kind:?} is not supported by the {backend} backend")]
    Capability {
        backend: Backend,
        kind: OperationKind,
    },

    /// The operation is malformed or its arguments cannot be expressed
    #[error("Invalid {kind:?} operation: {message}")]
    InvalidOperation {
        kind: OperationKind,
        message: String,
    },

    /// An existence check failed for a reason other than absence
    #[error(
        "Could not determine whether {path} exists ({category}): {raw}",
        category = .outcome.category(),
        raw = .outcome.raw_text()
    )]
    Indeterminate {
        path: String,
        outcome: ClassifiedOutcome,
    },

    /// The backing process could not be run
    #[error(transparent)]
    Process(#[from] shellfs_process::ProcessError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} config at {path}: {message}")]
    ConfigParse {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Failed to serialize {format} config for {path}: {message}")]
    ConfigSerialize {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Unsupported config format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigValue { key: String, message: String },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(kind: OperationKind, message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            kind,
            message: message.into(),
        }
    }
}
