//! Stage error types.

use crate::ai::GenerationError;
use crate::checkpoint::CheckpointError;
use std::path::PathBuf;
use thiserror::Error;

/// A name that is not one of the pipeline stages.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("Unknown stage '{0}' (expected one of: scan-confirm, dependency-resolution, data-model, persistence, shared-services, api-layer, workers, assembly)")]
pub struct UnknownStageError(pub String);

/// Errors that stop a stage before it can be checkpointed
#[derive(Debug, Error)]
pub enum StageError {
    /// Code generation failed fatally or ran out of retries
    #[error("Code generation for '{artifact}' failed: {source}")]
    Generation {
        artifact: String,
        #[source]
        source: GenerationError,
    },

    #[error("Failed to read source file '{}': {source}", .path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write output file '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Two source classes would be written to the same output file
    #[error("'{first}' and '{second}' both map to output file '{path}'")]
    DuplicateTarget {
        path: String,
        first: String,
        second: String,
    },

    #[error("Failed to render stage output: {0}")]
    Render(String),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error("Generation task terminated unexpectedly: {0}")]
    TaskFailed(String),

    /// Cancellation was requested before the stage finished
    #[error("Stage cancelled")]
    Cancelled,
}

impl StageError {
    /// The underlying generation failure, if any.
    pub fn generation_error(&self) -> Option<&GenerationError> {
        match self {
            Self::Generation { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn is_authentication(&self) -> bool {
        self.generation_error()
            .map(GenerationError::is_authentication)
            .unwrap_or(false)
    }
}
