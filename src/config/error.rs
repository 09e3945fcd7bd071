//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// A single problem with a run configuration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigViolation {
    #[error("Source path not specified. Call .source(path) before .build()")]
    MissingSource,

    #[error("Output path not specified. Call .output(path) before .build()")]
    MissingOutput,

    #[error("Output path '{}' overlaps the source project", .output.display())]
    OutputOverlapsSource { output: PathBuf },

    #[error("A dependency report was supplied without an inventory")]
    ReportWithoutInventory,

    #[error("Tool version must not be empty")]
    EmptyToolVersion,

    #[error("max_concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("Retry policy must allow at least one attempt")]
    ZeroAttempts,

    #[error("Call timeout must be greater than zero")]
    ZeroTimeout,
}

/// Errors raised while building a [`RunConfig`](super::RunConfig).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    /// Every violation found, not just the first
    #[error("Invalid run configuration: {}", join(.violations))]
    Invalid { violations: Vec<ConfigViolation> },
}

impl ConfigError {
    pub fn violations(&self) -> &[ConfigViolation] {
        match self {
            Self::Invalid { violations } => violations,
        }
    }
}

fn join(violations: &[ConfigViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
