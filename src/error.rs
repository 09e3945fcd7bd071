//! Top-level error type returned by a migration run.

use crate::checkpoint::CheckpointError;
use crate::config::ConfigError;
use crate::rollback::RollbackError;
use crate::scanner::ScanError;
use crate::stage::{Stage, StageError};
use thiserror::Error;

/// Process exit code for a successful run.
pub const EXIT_SUCCESS: i32 = 0;
/// Process exit code for a failed run.
pub const EXIT_FAILURE: i32 = 1;
/// Process exit code when the user declined to continue.
pub const EXIT_ABORTED: i32 = 2;
/// Process exit code when credentials were rejected.
pub const EXIT_AUTHENTICATION: i32 = 3;

/// Every fatal outcome of [`Migrator::run`](crate::Migrator::run).
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A stage failed; earlier checkpoints are intact
    #[error("Stage '{stage}' failed: {source}")]
    StageExecution {
        stage: Stage,
        #[source]
        source: StageError,
    },

    /// Credentials were rejected; resuming will not help until they are fixed
    #[error("Authentication failed{}: {message}. Re-authenticate and run again", stage_suffix(.stage))]
    Authentication {
        stage: Option<Stage>,
        message: String,
    },

    #[error("Migration aborted{}: {reason}", stage_suffix(.stage))]
    Aborted {
        stage: Option<Stage>,
        reason: String,
    },

    #[error("Migration cancelled{}", stage_suffix(.stage))]
    Cancelled { stage: Option<Stage> },

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error(transparent)]
    Rollback(#[from] RollbackError),
}

fn stage_suffix(stage: &Option<Stage>) -> String {
    match stage {
        Some(stage) => format!(" at stage '{}'", stage),
        None => String::new(),
    }
}

impl MigrationError {
    /// Wrap a stage failure, lifting authentication and cancellation out.
    pub fn from_stage(stage: Stage, source: StageError) -> Self {
        if let Some(auth) = source.generation_error().filter(|e| e.is_authentication()) {
            return Self::Authentication {
                stage: Some(stage),
                message: auth.to_string(),
            };
        }
        if matches!(source, StageError::Cancelled) {
            return Self::Cancelled { stage: Some(stage) };
        }
        Self::StageExecution { stage, source }
    }

    /// Exit code a command-line front end should use.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Aborted { .. } | Self::Cancelled { .. } => EXIT_ABORTED,
            Self::Authentication { .. } => EXIT_AUTHENTICATION,
            _ => EXIT_FAILURE,
        }
    }

    /// Stage the error is attributed to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::StageExecution { stage, .. } => Some(*stage),
            Self::Authentication { stage, .. }
            | Self::Aborted { stage, .. }
            | Self::Cancelled { stage } => *stage,
            _ => None,
        }
    }

    /// Whether `--resume` can pick up where this run stopped.
    pub fn is_resumable(&self) -> bool {
        matches!(
            self,
            Self::StageExecution { .. } | Self::Authentication { .. } | Self::Cancelled { .. }
        )
    }

    /// Advice for the user when a ledger exists for the failed run.
    pub fn resume_hint(&self, has_checkpoint: bool) -> Option<String> {
        if !has_checkpoint || !self.is_resumable() {
            return None;
        }
        Some(match self {
            Self::Authentication { .. } => {
                "Fix your credentials, then re-run with --resume to continue from the last checkpoint"
                    .to_string()
            }
            _ => match self.stage() {
                Some(stage) => format!(
                    "Re-run with --resume to continue from stage '{}', or roll back with --rollback",
                    stage
                ),
                None => "Re-run with --resume to continue from the last checkpoint".to_string(),
            },
        })
    }
}
