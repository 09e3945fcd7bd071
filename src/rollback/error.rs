//! Rollback error types.

use crate::checkpoint::CheckpointError;
use crate::stage::UnknownStageError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a rollback. The ledger is left as a valid prefix.
#[derive(Debug, Error)]
pub enum RollbackError {
    #[error(transparent)]
    UnknownStage(#[from] UnknownStageError),

    #[error("'{}' is not a run checkpoint directory", .0.display())]
    InvalidCheckpointDir(PathBuf),

    #[error("Run ledger '{}' has checkpoints but no manifest; cannot locate its output", .0.display())]
    MissingManifest(PathBuf),

    #[error("Refusing to delete '{}': it overlaps the source project", .output.display())]
    UnsafeOutputPath { output: PathBuf },

    #[error("Failed to delete '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}
