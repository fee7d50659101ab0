//! Error types for the filtering core
//!
//! Every I/O failure carries the path and the operation that failed, so the
//! caller can report it without extra context.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::policy::PolicyError;

/// Errors surfaced by the pipeline, the writer and the merger
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("failed to open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unsupported encoding {encoding} in {path:?}")]
    UnsupportedEncoding { path: PathBuf, encoding: &'static str },

    #[error(transparent)]
    Policy(#[from] PolicyError),
}

impl FilterError {
    pub(crate) fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Open { path: path.into(), source }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Read { path: path.into(), source }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Write { path: path.into(), source }
    }

    pub(crate) fn create_dir(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::CreateDir { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, FilterError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_message_includes_path_and_operation() {
        let err = FilterError::open(
            "dict/rockyou.txt",
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
        );
        let msg = err.to_string();

        assert!(msg.starts_with("failed to open"));
        assert!(msg.contains("rockyou.txt"));
        assert!(err.source().is_some());
    }
}
