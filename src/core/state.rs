//! Migration run states.
//!
//! A run moves through `NotStarted → Scanning → Analyzing → Running(stage)…
//! → Completed`. `Failed` is reachable from any non-final state and
//! `Aborted` is entered when the user declines an interactive confirmation.

use crate::stage::Stage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a migration run in its lifecycle.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationState {
    NotStarted,
    Scanning,
    Analyzing,
    Running(Stage),
    Completed,
    /// Failure, carrying the stage that was executing (if any).
    Failed(Option<Stage>),
    Aborted,
}

impl MigrationState {
    /// The state's name for display and logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotStarted => "NotStarted",
            Self::Scanning => "Scanning",
            Self::Analyzing => "Analyzing",
            Self::Running(_) => "Running",
            Self::Completed => "Completed",
            Self::Failed(_) => "Failed",
            Self::Aborted => "Aborted",
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_) | Self::Aborted)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Aborted)
    }

    /// Whether the lifecycle permits moving from `self` to `next` (pure).
    ///
    /// Stages only ever advance; final states accept nothing.
    pub fn can_transition_to(&self, next: &MigrationState) -> bool {
        if self.is_final() {
            return false;
        }

        match (self, next) {
            (_, Self::Failed(_)) | (_, Self::Aborted) => true,
            (Self::NotStarted, Self::Scanning) => true,
            (Self::NotStarted | Self::Scanning, Self::Analyzing) => true,
            (Self::NotStarted | Self::Analyzing, Self::Running(_)) => true,
            (Self::Running(current), Self::Running(stage)) => stage.index() > current.index(),
            (Self::NotStarted | Self::Analyzing | Self::Running(_), Self::Completed) => true,
            _ => false,
        }
    }

    /// The stage being executed, or the stage that failed.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Running(stage) => Some(*stage),
            Self::Failed(stage) => *stage,
            _ => None,
        }
    }
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage() {
            Some(stage) => write!(f, "{}({})", self.name(), stage),
            None => f.write_str(self.name()),
        }
    }
}
