//! Checkpoint error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during checkpoint operations
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// Serialization of a ledger record failed
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// A ledger record could not be parsed
    #[error("Deserialization of '{}' failed: {message}", .path.display())]
    DeserializationFailed { path: PathBuf, message: String },

    /// Record was written by a newer format version
    #[error("Unsupported checkpoint version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// Another process holds the run's ledger lock
    #[error("Another migration is already running against this source (lock '{}')", .0.display())]
    Locked(PathBuf),

    /// Filesystem failure while reading or writing the ledger
    #[error("Checkpoint I/O on '{}' failed: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CheckpointError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
