//! Errors raised while importing a dump.

use std::io;
use std::path::PathBuf;

use dump2h5_format::FormatError;

/// Classification of an [`ImportError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Metadata,
    SizeMismatch,
    Alignment,
    Io,
    Library,
}

/// Errors for one import. Every variant is terminal for the run.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// Sidecar metadata is missing, malformed or describes an invalid shape.
    #[error("{}: {reason}", path.display())]
    Metadata { path: PathBuf, reason: String },

    /// Fixed dimensions require an exact byte count.
    #[error("{}: Expected size {expected}, but {actual} found", path.display())]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    /// An unlimited leading dimension requires a whole number of records.
    #[error("{}: Expected size to be multiple of {record}, but {actual} found", path.display())]
    PartialRecord {
        path: PathBuf,
        record: u64,
        actual: u64,
    },

    /// Payload does not hold a whole number of elements.
    #[error("{}: Size {actual} is not a multiple of the element size {element_size}", path.display())]
    Alignment {
        path: PathBuf,
        element_size: u64,
        actual: u64,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The container engine refused an operation.
    #[error("{}: {context}: {source}", path.display())]
    Library {
        path: PathBuf,
        context: String,
        #[source]
        source: FormatError,
    },
}

impl ImportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImportError::Metadata { .. } => ErrorKind::Metadata,
            ImportError::SizeMismatch { .. } | ImportError::PartialRecord { .. } => {
                ErrorKind::SizeMismatch
            }
            ImportError::Alignment { .. } => ErrorKind::Alignment,
            ImportError::Io { .. } => ErrorKind::Io,
            ImportError::Library { .. } => ErrorKind::Library,
        }
    }

    pub(crate) fn metadata(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ImportError::Metadata {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ImportError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn library(
        path: impl Into<PathBuf>,
        context: impl Into<String>,
        source: FormatError,
    ) -> Self {
        ImportError::Library {
            path: path.into(),
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;
