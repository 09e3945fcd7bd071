//! Boundary to the external code-generation backend.
//!
//! The engine only needs two things from a backend: a credential check and
//! a transformation of one unit of work into generated source text.
//! Concrete HTTP clients live outside this crate and implement
//! [`CodeGenerator`].

pub mod error;
mod retry;

pub use error::GenerationError;
pub use retry::{generate_with_retry, RetryPolicy};

use crate::inventory::{ArtifactKind, SourceLanguage};
use crate::stage::Stage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One unit of transformation work.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformRequest {
    pub stage: Stage,
    pub kind: ArtifactKind,
    /// Class name being transformed
    pub artifact: String,
    /// Source file, relative to the project root
    pub source_path: String,
    /// Source file contents
    pub source: String,
    /// Destination, relative to the output root
    pub target_path: String,
    pub target_package: String,
    pub language: SourceLanguage,
    /// Whether this is a test class
    pub test: bool,
    pub instructions: String,
    /// Files planned by earlier stages, for cross-module references
    pub context: Vec<String>,
}

/// Generated source text for one request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedSource {
    pub content: String,
}

impl GeneratedSource {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// External code-generation capability.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str {
        "code-generator"
    }

    /// Check that the configured credentials are usable.
    async fn validate_credentials(&self) -> Result<(), GenerationError>;

    /// Produce target-layout source for `request`.
    async fn transform(&self, request: &TransformRequest)
        -> Result<GeneratedSource, GenerationError>;
}
