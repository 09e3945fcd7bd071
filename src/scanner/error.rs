//! Scanner error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while scanning a source project
#[derive(Debug, Error)]
pub enum ScanError {
    /// Source path is missing or not a directory
    #[error("Source path '{}' does not exist or is not a directory", .0.display())]
    NotFound(PathBuf),

    /// Directory exists but has no recognizable build descriptor
    #[error("No build descriptor (pom.xml, build.gradle, build.gradle.kts) in '{}'", .0.display())]
    NoBuildDescriptor(PathBuf),

    /// The build descriptor itself could not be read
    #[error("Failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The blocking scan task did not complete
    #[error("Scan interrupted: {0}")]
    Interrupted(String),
}
