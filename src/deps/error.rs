//! Classification error types.

use thiserror::Error;

/// A dependency entry that cannot be classified on its merits.
///
/// Never surfaced to callers: the classifier logs it and files the entry
/// as unsupported.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClassificationError {
    #[error("Dependency entry has an empty name")]
    EmptyName,

    #[error("Malformed dependency entry '{entry}'")]
    Malformed { entry: String },
}
